#[tokio::main]
async fn main() {
    if let Err(err) = feed_notifier_lib::run().await {
        eprintln!("feed-notifier: {err}");
        std::process::exit(1);
    }
}

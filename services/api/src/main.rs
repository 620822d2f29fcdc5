use loan_tracker_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("loan tracker error: {err}");
        std::process::exit(1);
    }
}

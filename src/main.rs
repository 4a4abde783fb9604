use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    streambot::run().await
}

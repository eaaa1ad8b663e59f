#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lib_bridge_host::init().await
}

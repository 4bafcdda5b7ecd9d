use setbit::{ClientConfig, ConversionEvent, DEFAULT_POLL_INTERVAL};

pub fn main() -> setbit::Result<()> {
    env_logger::init();

    let api_key = std::env::var("SETBIT_API_KEY").unwrap_or_default();

    // Loads all flags for the API key and tags. Fails on an invalid API key.
    let client = ClientConfig::from_api_key(api_key)
        .tag("env", "development")
        .tag("app", "example")
        .to_client()?;
    println!("Loaded {} flags", client.cache_size());

    // Keep flags up to date in the background.
    let poller = client.start_poller_thread(DEFAULT_POLL_INTERVAL)?;

    let user_id = "user-123";

    if client.enabled("example-boolean-flag", user_id, false) {
        println!("Showing new feature");
    } else {
        println!("Showing old feature");
    }

    let variant = client.variant("pricing-experiment", user_id, "control");
    let price = match variant.as_str() {
        "variant_a" => 99,
        "variant_b" => 149,
        _ => 129,
    };
    println!("Assigned variant {variant:?}, price ${price}");

    client.track(
        ConversionEvent::new("purchase", user_id)
            .flag_name("pricing-experiment")
            .variant(variant)
            .metadata("amount", f64::from(price)),
    );

    poller.shutdown()
}

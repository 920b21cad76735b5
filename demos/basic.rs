use typed_get::{ClientOptions, FaultKind, RetryPolicy, TypedGetClient, ValueResponse};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = TypedGetClient::<ValueResponse>::from_env()
        .map_err(anyhow::Error::msg)?
        .with_options(
            ClientOptions::default()
                .with_timeout_ms(5_000)
                .with_retry_policy(RetryPolicy::default().never_on(FaultKind::EmptyResponse)),
        );

    match client.get().await? {
        Some(response) => println!("value: {}", response.value),
        None => println!("not found"),
    }

    Ok(())
}

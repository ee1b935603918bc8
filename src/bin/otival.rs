use anyhow::Result;
use otival::cli::{actions, actions::Action, start};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Start the program
    let action = start()?;

    // Handle the action
    match action {
        Action::Server { port, dsn } => actions::server::execute(port, dsn).await?,
        Action::ApiKeyAdd { dsn, label } => actions::apikey::add(&dsn, &label).await?,
        Action::ApiKeyList { dsn } => actions::apikey::list(&dsn).await?,
        Action::ApiKeyDelete { dsn, id } => actions::apikey::delete(&dsn, id).await?,
        Action::DeviceAdd { dsn, label } => actions::device::add(&dsn, &label).await?,
        Action::DeviceAddExisting {
            dsn,
            label,
            public_id,
            private_id,
            key,
        } => actions::device::add_existing(&dsn, &label, &public_id, &private_id, &key).await?,
        Action::DeviceList { dsn } => actions::device::list(&dsn).await?,
        Action::DeviceDelete { dsn, public_id } => {
            actions::device::delete(&dsn, &public_id).await?;
        }
    }

    Ok(())
}

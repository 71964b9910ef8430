use std::time::Duration;

use bladelink::frame::{Command, Event};
use bladelink::session::{
    ConnectionManager, ConnectionState, Notification, Notifications, SessionConfig,
};

use crate::cmd::{parse_duration, runtime, SendArgs};
use crate::exit::{
    session_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT, TRANSPORT_ERROR,
};
use crate::output::{print_event, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let command = args.frame.command()?;
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let config = SessionConfig {
        // One attempt only, and no SYS query for --wait to pick up.
        retry_on_error: false,
        identify_on_connect: false,
        ..args.device.session_config()?
    };

    runtime()?.block_on(send(config, command, args.wait.then_some(wait_timeout), format))
}

async fn send(
    config: SessionConfig,
    command: Command,
    wait: Option<Duration>,
    format: OutputFormat,
) -> CliResult<i32> {
    let (manager, mut notifications) = ConnectionManager::new();
    manager
        .connect_with_config(config)
        .await
        .map_err(|err| session_error("connect failed", err))?;
    wait_until_connected(&mut notifications).await?;

    manager
        .send(&command)
        .await
        .map_err(|err| session_error("send failed", err))?;

    let result = match wait {
        Some(limit) => wait_for_event(&mut notifications, limit).await.map(|event| {
            print_event(&event, format);
            SUCCESS
        }),
        None => Ok(SUCCESS),
    };

    let _ = manager.shutdown().await;
    result
}

async fn wait_until_connected(notifications: &mut Notifications) -> CliResult<()> {
    while let Some(notification) = notifications.recv().await {
        match notification {
            Notification::StatusChanged {
                state: ConnectionState::Connected,
                ..
            } => return Ok(()),
            Notification::StatusChanged {
                state: ConnectionState::Disconnected,
                message,
                ..
            } => {
                return Err(CliError::new(
                    TRANSPORT_ERROR,
                    message.unwrap_or_else(|| "disconnected".to_string()),
                ))
            }
            _ => {}
        }
    }
    Err(CliError::new(FAILURE, "session closed before connecting"))
}

async fn wait_for_event(notifications: &mut Notifications, limit: Duration) -> CliResult<Event> {
    let next_event = async {
        while let Some(notification) = notifications.recv().await {
            match notification {
                Notification::Event(event) => return Ok(event),
                Notification::StatusChanged {
                    state: ConnectionState::Disconnected,
                    message,
                    ..
                } => {
                    return Err(CliError::new(
                        TRANSPORT_ERROR,
                        message.unwrap_or_else(|| "disconnected".to_string()),
                    ))
                }
                Notification::StatusChanged { .. } => {}
            }
        }
        Err(CliError::new(FAILURE, "session closed before a reply arrived"))
    };

    tokio::time::timeout(limit, next_event)
        .await
        .map_err(|_| CliError::new(TIMEOUT, format!("no reply within {limit:?}")))?
}

use bladelink::frame::catalog;
use bladelink::session::{ConnectionManager, ConnectionState, Notification, SessionConfig};
use tracing::{info, warn};

use crate::cmd::{runtime, MonitorArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_event, print_status, OutputFormat};

/// A `UMIXSUB` request: mixer sub-address plus parameter name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Subscription {
    subaddr: String,
    parameter: String,
}

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.device.session_config()?;
    let subscriptions = args
        .subscribe
        .iter()
        .map(|entry| parse_subscription(entry))
        .collect::<CliResult<Vec<_>>>()?;

    runtime()?.block_on(monitor(config, subscriptions, args.count, format))
}

async fn monitor(
    config: SessionConfig,
    subscriptions: Vec<Subscription>,
    count: Option<usize>,
    format: OutputFormat,
) -> CliResult<i32> {
    let (manager, mut notifications) = ConnectionManager::new();
    manager
        .connect_with_config(config)
        .await
        .map_err(|err| session_error("connect failed", err))?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut printed = 0usize;
    loop {
        let notification = tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            notification = notifications.recv() => notification,
        };
        let Some(notification) = notification else {
            break;
        };

        match notification {
            Notification::StatusChanged {
                state,
                status,
                message,
            } => {
                print_status(state, status, message.as_deref(), format);
                // Subscriptions do not survive a reconnect.
                if state == ConnectionState::Connected {
                    subscribe(&manager, &subscriptions).await;
                }
            }
            Notification::Event(event) => {
                print_event(&event, format);
                printed = printed.saturating_add(1);
                if count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
        }
    }

    let _ = manager.shutdown().await;
    Ok(SUCCESS)
}

async fn subscribe(manager: &ConnectionManager, subscriptions: &[Subscription]) {
    for subscription in subscriptions {
        let command = catalog::umix_subscribe(&subscription.subaddr, &subscription.parameter, true);
        if let Err(err) = manager.send(&command).await {
            warn!(%command, error = %err, "subscribe failed");
        }
    }
}

fn parse_subscription(entry: &str) -> CliResult<Subscription> {
    match entry.rsplit_once(':') {
        Some((subaddr, parameter)) if !subaddr.is_empty() && !parameter.is_empty() => {
            Ok(Subscription {
                subaddr: subaddr.to_string(),
                parameter: parameter.to_string(),
            })
        }
        _ => Err(CliError::new(
            USAGE,
            format!("--subscribe expects SUBADDR:PARAM, got {entry:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_subscription_splits_on_last_colon() {
        assert_eq!(
            parse_subscription("1.2:ON").unwrap(),
            Subscription {
                subaddr: "1.2".into(),
                parameter: "ON".into(),
            }
        );
        assert_eq!(parse_subscription("1.2:FDRA").unwrap().parameter, "FDRA");
    }

    #[test]
    fn parse_subscription_rejects_incomplete_specs() {
        for entry in ["1.2", ":ON", "1.2:", ""] {
            assert_eq!(parse_subscription(entry).unwrap_err().code, USAGE, "{entry}");
        }
    }
}

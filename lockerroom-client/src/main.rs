//! `lockerroom-sync`: signs in with the configured token, warms the cache,
//! and follows the unread badge until interrupted.

use std::sync::Arc;

use lockerroom_cache::QueryClient;
use lockerroom_client::config::ClientConfig;
use lockerroom_client::gate::{authorize, Access};
use lockerroom_client::services::LockerRoom;
use lockerroom_client::telemetry::init_tracing;
use lockerroom_client::RestClient;
use lockerroom_core::{LockerRoomApi, LockerRoomError, Session};

#[tokio::main]
async fn main() -> Result<(), LockerRoomError> {
    let config = ClientConfig::load()?;
    init_tracing(&config.logging)?;

    let rest = RestClient::new(&config)?;
    let api: Arc<dyn LockerRoomApi> = Arc::new(rest);

    let me = api.my_profile().await?;
    let session = Session::new(me.user_id, me.role, config.auth.bearer_token.clone());
    let landing = session.role.landing();
    let start = authorize(&landing, Some(&session)).destination(landing);
    tracing::info!(
        user_id = %session.user_id,
        role = session.role.as_str(),
        start = %start.path(),
        "Signed in"
    );

    let client = QueryClient::new(config.cache_config());
    let _gc = client.spawn_gc();
    let app = LockerRoom::new(
        api,
        client,
        &session,
        config.notification_poll_interval(),
    );

    let feed = app.feed.load_first_page().await?;
    tracing::info!(
        posts = feed.pages.iter().map(|p| p.posts.len()).sum::<usize>(),
        more = feed.has_next_page(),
        "Loaded feed"
    );

    let mut unread = app.notifications.watch_unread();
    loop {
        tokio::select! {
            changed = unread.changed() => {
                if !changed {
                    break;
                }
                match unread.current() {
                    Ok(entry) => {
                        if let Some(count) = entry.value {
                            tracing::info!(unread = count.unread, "Unread notifications");
                        }
                        if let Some(err) = entry.error {
                            if let Some(Access::RedirectToLogin) = Access::for_error(&err) {
                                tracing::warn!("Session expired");
                                break;
                            }
                            tracing::warn!(error = %err, "Unread count refresh failed");
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "Unread count unavailable"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    app.sign_out();
    Ok(())
}

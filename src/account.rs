/// Account command handling
/// 1. Login
/// 2. Signup
/// 3. Logout
// region:    --- Imports
use crate::activity::{ActivityTracker, Operation};
use crate::api::SharedMarketApi;
use crate::cache::MarketCache;
use crate::error::{MarketError, Result};
use crate::session::{RegisteredAccount, SessionState};
use crate::validation::{LoginForm, SignupForm};
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Commands
/// 1. Login
pub async fn handle_login(
    form: LoginForm,
    api: &SharedMarketApi,
    cache: &MarketCache,
    activity: &ActivityTracker,
) -> Result<SessionState> {
    let request = form.into_request()?;
    let _busy = activity.begin(Operation::Login);
    info!("{:<12} --> login: {}", "Command", request.email);

    let session = api.login(&request).await?;
    if let Some(user) = &session.user {
        if user.is_suspended() {
            warn!("{:<12} --> suspended account: {}", "Command", user.id);
            if let Err(e) = api.logout().await {
                warn!("{:<12} --> logout after suspension failed: {}", "Command", e);
            }
            api.clear_session();
            return Err(MarketError::Unauthorized(
                "This account has been suspended".to_string(),
            ));
        }
        cache.remember_user(user.clone());
    }
    Ok(session)
}

/// 2. Signup
pub async fn handle_signup(
    form: SignupForm,
    api: &SharedMarketApi,
    activity: &ActivityTracker,
) -> Result<RegisteredAccount> {
    let request = form.into_request()?;
    let _busy = activity.begin(Operation::Signup);
    info!("{:<12} --> signup: {}", "Command", request.email);

    let account = api.register(&request).await?;
    info!("{:<12} --> registered: {}", "Command", account.id);
    Ok(account)
}

/// 3. Logout. The local session is only cleared once the service confirms.
pub async fn handle_logout(api: &SharedMarketApi) -> Result<()> {
    api.logout().await?;
    info!("{:<12} --> logged out", "Command");
    Ok(())
}
// endregion: --- Commands

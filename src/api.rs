// src/api.rs
use crate::analytics::{analytics, chart_series};
use crate::auth::{self, SessionManager, SESSION_COOKIE};
use crate::context::AppContext;
use crate::error::{handle_rejection, ApiError};
use crate::market::market_row;
use crate::models::{
    AccountId, InitialData, LoginRequest, Profile, ProfileUpdate, RegisterRequest,
};
use futures_util::StreamExt;
use log::{error, info, warn};
use serde_json::json;
use std::path::PathBuf;
use warp::sse::Event;
use warp::{Filter, Rejection, Reply};

pub fn routes(
    ctx: AppContext,
    static_dir: PathBuf,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .and(warp::fs::file(static_dir.join("index.html")));

    let assets = warp::path("static").and(warp::fs::dir(static_dir));

    let register = warp::path!("api" / "register")
        .and(warp::post())
        .and(with_ctx(ctx.clone()))
        .and(warp::body::json())
        .and_then(register_handler);

    let login = warp::path!("api" / "login")
        .and(warp::post())
        .and(with_ctx(ctx.clone()))
        .and(warp::body::json())
        .and_then(login_handler);

    let logout = warp::path!("api" / "logout")
        .and(warp::post())
        .and(with_ctx(ctx.clone()))
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .and_then(logout_handler);

    let get_profile = warp::path!("api" / "user-details")
        .and(warp::get())
        .and(with_account(ctx.clone()))
        .and(with_ctx(ctx.clone()))
        .and_then(get_profile_handler);

    let update_profile = warp::path!("api" / "user-details")
        .and(warp::post())
        .and(with_account(ctx.clone()))
        .and(with_ctx(ctx.clone()))
        .and(warp::body::json())
        .and_then(update_profile_handler);

    let stream = warp::path!("stream")
        .and(warp::get())
        .and(with_ctx(ctx.clone()))
        .map(stream_handler);

    let initial_data = warp::path!("api" / "initial-data")
        .and(warp::get())
        .and(with_ctx(ctx))
        .and_then(initial_data_handler);

    let analytics_data = warp::path!("api" / "analytics-data")
        .and(warp::get())
        .map(|| warp::reply::json(&analytics(&mut rand::rng())));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["content-type"]);

    index
        .or(assets)
        .or(register)
        .or(login)
        .or(logout)
        .or(get_profile)
        .or(update_profile)
        .or(stream)
        .or(initial_data)
        .or(analytics_data)
        .recover(handle_rejection)
        .with(cors)
        .with(warp::log("crypto_dash::http"))
}

fn with_ctx(
    ctx: AppContext,
) -> impl Filter<Extract = (AppContext,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// Resolves the session cookie to an account or rejects with `Unauthenticated`.
fn with_account(
    ctx: AppContext,
) -> impl Filter<Extract = (AccountId,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).and_then(move |token: Option<String>| {
        let ctx = ctx.clone();
        async move {
            ctx.sessions
                .current_account(token.as_deref())
                .map_err(warp::reject::custom)
        }
    })
}

async fn register_handler(
    ctx: AppContext,
    request: RegisterRequest,
) -> Result<impl Reply, Rejection> {
    match auth::register(ctx.accounts.as_ref(), request).await {
        Ok(account) => {
            info!("Account {} created.", account.id);
            Ok(warp::reply::json(
                &json!({ "success": true, "message": "Account created!" }),
            ))
        }
        Err(e) => {
            warn!("Failed to register account: {}", e);
            Err(warp::reject::custom(e))
        }
    }
}

async fn login_handler(ctx: AppContext, request: LoginRequest) -> Result<impl Reply, Rejection> {
    let account =
        match auth::authenticate(ctx.accounts.as_ref(), &request.email, &request.password).await {
            Ok(account) => account,
            Err(e) => {
                warn!("Login failed: {}", e);
                return Err(warp::reject::custom(e));
            }
        };
    match ctx.sessions.open(&account) {
        Ok(token) => {
            info!("Account {} logged in.", account);
            Ok(warp::reply::with_header(
                warp::reply::json(&json!({ "success": true, "message": "Login successful" })),
                "set-cookie",
                SessionManager::cookie(&token),
            ))
        }
        Err(e) => {
            error!("Failed to open session: {}", e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

async fn logout_handler(ctx: AppContext, token: Option<String>) -> Result<impl Reply, Rejection> {
    if let Some(token) = token {
        ctx.sessions.close(&token);
    }
    Ok(warp::reply::with_header(
        warp::reply::json(&json!({ "success": true })),
        "set-cookie",
        SessionManager::cleared_cookie(),
    ))
}

async fn get_profile_handler(account: AccountId, ctx: AppContext) -> Result<impl Reply, Rejection> {
    match ctx.accounts.find_by_id(&account).await {
        Ok(Some(found)) => Ok(warp::reply::json(&Profile::from(&found))),
        Ok(None) => Err(warp::reject::custom(ApiError::Unauthenticated)),
        Err(e) => {
            error!("Failed to load profile {}: {}", account, e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

async fn update_profile_handler(
    account: AccountId,
    ctx: AppContext,
    update: ProfileUpdate,
) -> Result<impl Reply, Rejection> {
    match ctx.accounts.update_profile(&account, &update).await {
        Ok(_) => {
            info!("Profile {} updated.", account);
            Ok(warp::reply::json(
                &json!({ "success": true, "message": "Profile updated" }),
            ))
        }
        Err(e) => {
            error!("Failed to update profile {}: {}", account, e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

/// Server-sent market snapshots for as long as the client stays connected
/// or until the server shuts down.
fn stream_handler(ctx: AppContext) -> impl Reply {
    let events = ctx
        .feed
        .subscribe()
        .take_until(ctx.shutdown.clone().cancelled_owned())
        .map(|message| Event::default().json_data(&*message));
    warp::sse::reply(warp::sse::keep_alive().stream(events))
}

async fn initial_data_handler(ctx: AppContext) -> Result<impl Reply, Rejection> {
    match ctx.market.list_instruments().await {
        Ok(instruments) => {
            let data = InitialData {
                market: instruments.iter().map(market_row).collect(),
                chart: chart_series(&mut rand::rng()),
            };
            Ok(warp::reply::json(&data))
        }
        Err(e) => {
            error!("Failed to load instruments: {}", e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

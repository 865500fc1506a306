use log::info;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            auth::{
                AuthToken, OwnerCredentials, OwnerDescription, OwnerRegistration,
                AUTH_TOKEN_COOKIE,
            },
            notice::{Notice, SIGNED_IN, SIGNED_OUT},
        },
        db::{NewOwner, Owner},
        store::Store,
    },
};

pub fn routes() -> Vec<Route> {
    routes![register, authenticate, current_owner, logout]
}

#[post("/auth/owners", data = "<registration>", format = "json")]
pub async fn register(
    cookies: &CookieJar<'_>,
    registration: Json<OwnerRegistration>,
    store: Store,
    config: &State<Config>,
) -> Result<(Status, Json<Notice<OwnerDescription>>)> {
    let owner = NewOwner::try_from(registration.0).map_err(Error::Validation)?;
    let owner = store.insert_owner(owner).await?;
    info!("Registered owner {}", owner.id);

    cookies.add(AuthToken::new(&owner).into_cookie(config));

    Ok((Status::Created, Json(Notice::new(SIGNED_IN, owner.into()))))
}

#[post("/auth/owner", data = "<credentials>", format = "json")]
pub async fn authenticate(
    cookies: &CookieJar<'_>,
    credentials: Json<OwnerCredentials>,
    store: Store,
    config: &State<Config>,
) -> Result<Json<Notice<OwnerDescription>>> {
    let owner = store
        .find_owner_by_email(credentials.email.trim())
        .await?
        .filter(|owner| owner.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "No owner found with the provided email and password combination.".to_string(),
            )
        })?;

    cookies.add(AuthToken::new(&owner).into_cookie(config));

    Ok(Json(Notice::new(SIGNED_IN, owner.into())))
}

#[get("/auth/owner")]
pub async fn current_owner(
    token: AuthToken<Owner>,
    store: Store,
) -> Result<Json<OwnerDescription>> {
    let owner = store
        .find_owner(token.id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Owner {}", token.id)))?;
    Ok(Json(owner.into()))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Json<Notice<()>> {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Json(Notice::new(SIGNED_OUT, ()))
}

use crate::api::{ApiClient, Credentials, SignUpForm};
use crate::error::AppResult;

use super::{require, Navigation};

#[derive(Debug, Clone)]
pub struct AuthScreen {
    api: ApiClient,
}

impl AuthScreen {
    pub fn new(api: ApiClient) -> Self { Self { api } }

    pub async fn sign_up(&self, form: SignUpForm) -> AppResult<Navigation> {
        require("Username", &form.username)?;
        require("Password", &form.password)?;
        self.api.sign_up(&form.normalized()).await?;
        tracing::info!(target: "postboard::cli", "signed up; continue with sign-in");
        Ok(Navigation::SignIn)
    }

    /// Exchange credentials for a token and adopt it. A token that does not decode is refused
    /// by the session manager and surfaces as an `Auth` error.
    pub async fn sign_in(&self, creds: &Credentials) -> AppResult<Navigation> {
        require("Username", &creds.username)?;
        require("Password", &creds.password)?;
        let token = self.api.sign_in(creds).await?;
        self.api.session().sign_in(&token)?;
        Ok(Navigation::Home)
    }

    pub fn sign_out(&self) -> AppResult<Navigation> {
        self.api.session().sign_out()?;
        Ok(Navigation::Home)
    }
}

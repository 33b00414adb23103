//! Authenticated server session.
//!
//! A [`Session`] owns the [`ServerClient`], the credentials it signs in with,
//! and the default request options (an owner-email filter). Operations run
//! inside [`Session::scoped`], which signs in before and signs out after the
//! wrapped future, so no token outlives a single operation.

use std::future::Future;
use tracing::{error, info, warn};

use crate::config::{pause, Credentials, Pacing};
use crate::contract::ServerClient;
use crate::error::PlumberError;
use crate::items::{Filter, RequestOptions, DEFAULT_PAGE_SIZE};

/// Settings applied to every operation of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub pacing: Pacing,
    pub page_size: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            pacing: Pacing::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

pub struct Session<C> {
    client: C,
    credentials: Credentials,
    default_options: RequestOptions,
    settings: SessionSettings,
}

impl<C> Session<C>
where
    C: ServerClient,
{
    /// Validates the credentials and proves them with one sign-in/sign-out round trip.
    ///
    /// Fails with [`PlumberError::Credentials`] for incomplete credentials and
    /// [`PlumberError::Login`] when the server rejects them. There is no retry.
    pub async fn login(
        client: C,
        credentials: Credentials,
        settings: SessionSettings,
    ) -> Result<Self, PlumberError> {
        credentials.validate()?;

        let default_options = RequestOptions::default()
            .with_page_size(settings.page_size)
            .with_filter(Filter::owner_email(credentials.email.clone()));

        let session = Session {
            client,
            credentials,
            default_options,
            settings,
        };

        info!(server = %session.credentials.server, "Signing in...");
        session
            .scoped(async { Ok(()) })
            .await
            .map_err(|e| {
                error!(error = %e, "Login failed");
                match e {
                    PlumberError::Login(_) => e,
                    other => PlumberError::Login(other.to_string()),
                }
            })?;
        info!(username = %session.credentials.username, "Signed in!");

        pause(settings.pacing.after_sign_in).await;
        Ok(session)
    }

    /// Runs `operation` between a sign-in and a sign-out.
    ///
    /// A failed sign-out is logged and does not mask the operation's result.
    pub async fn scoped<T, F>(&self, operation: F) -> Result<T, PlumberError>
    where
        F: Future<Output = Result<T, PlumberError>>,
    {
        self.client.sign_in(&self.credentials).await?;
        let result = operation.await;
        if let Err(e) = self.client.sign_out().await {
            warn!(error = %e, "Sign-out failed");
        }
        result
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Options filtering on items owned by the signed-in email.
    pub fn default_options(&self) -> &RequestOptions {
        &self.default_options
    }

    /// Options without filters, using the session's page size.
    pub fn unfiltered_options(&self) -> RequestOptions {
        RequestOptions::default().with_page_size(self.settings.page_size)
    }

    pub fn pacing(&self) -> &Pacing {
        &self.settings.pacing
    }
}

//! Social login provider listing, proxied from the external auth
//! service. Authentication itself happens upstream; this endpoint only
//! tells the client which login buttons to render.

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;

use kiez_core::SocialProvider;

use crate::{ApiError, AppState};

/// One identity provider as the auth service reports it.
#[derive(Debug, Deserialize)]
pub struct UpstreamProvider {
    pub alias: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub enabled: bool,
    #[serde(rename = "providerId")]
    pub provider_id: String,
}

/// `GET /api/auth/providers`.
///
/// Failures upstream degrade to an empty list so the login page still
/// renders with password auth only.
pub async fn list_providers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(url) = state.auth_settings_url.as_deref() else {
        return Ok(Json(Vec::<SocialProvider>::new()));
    };

    let providers = match fetch_providers(&state.http, url).await {
        Ok(providers) => providers,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch auth providers");
            Vec::new()
        }
    };

    Ok(Json(providers))
}

async fn fetch_providers(
    client: &reqwest::Client,
    url: &str,
) -> kiez_core::Result<Vec<SocialProvider>> {
    let upstream: Vec<UpstreamProvider> = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(kiez_core::Error::from)?
        .json()
        .await?;

    Ok(upstream
        .into_iter()
        .filter(|p| p.enabled)
        .map(|p| SocialProvider {
            name: p.display_name.unwrap_or_else(|| p.alias.clone()),
            icon: provider_icon(&p.alias).to_string(),
            id: p.alias,
            provider_type: p.provider_id,
            enabled: true,
        })
        .collect())
}

fn provider_icon(id: &str) -> &'static str {
    match id {
        "google" => "🌟",
        "github" => "🐙",
        "keycloak" => "🎮",
        _ => "🔑",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_icon_known_and_fallback() {
        assert_eq!(provider_icon("github"), "🐙");
        assert_eq!(provider_icon("corporate-saml"), "🔑");
    }

    #[test]
    fn test_upstream_provider_deserializes_keycloak_shape() {
        let json = r#"{
            "alias": "google",
            "displayName": "Google",
            "enabled": true,
            "providerId": "oidc",
            "config": {}
        }"#;
        let p: UpstreamProvider = serde_json::from_str(json).unwrap();
        assert_eq!(p.alias, "google");
        assert_eq!(p.provider_id, "oidc");
        assert!(p.enabled);
    }
}

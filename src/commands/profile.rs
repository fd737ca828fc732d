use crate::args::ProfileFields;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::{UserId, UserProfile};
use crate::{Config, Result};
use anyhow::anyhow;

/// Shows the stored profile of `user`, or an empty one if nothing has been stored yet.
pub async fn profile_show(config: Config, user: &UserId) -> Result<Out<UserProfile>> {
    let stored = config
        .records(user)
        .profile()
        .await
        .pub_result(ErrorType::Database)?;
    let profile = stored.unwrap_or_else(|| UserProfile::new(user.clone()));
    let message = format!(
        "{} ({}), {}",
        profile.display_name.as_deref().unwrap_or("No display name"),
        profile.user_id,
        profile.email.as_deref().unwrap_or("no email")
    );
    Ok(Out::new(message, profile))
}

/// Writes the given profile fields and keeps the others.
///
/// # Errors
/// - Returns an error if no field is given or a field is invalid.
pub async fn profile_set(
    config: Config,
    user: &UserId,
    fields: &ProfileFields,
) -> Result<Out<UserProfile>> {
    let update = fields.update();
    if update.is_empty() {
        return Err(anyhow!("Nothing to change, give --display-name or --email"))
            .pub_result(ErrorType::Request);
    }
    update.validate().pub_result(ErrorType::Request)?;
    let profile = config
        .records(user)
        .update_profile(&update)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(format!("Updated the profile of '{user}'"), profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_profile_show_and_set() {
        let env = TestEnv::new().await;
        let user = env.user();

        let shown = profile_show(env.config(), &user).await.unwrap();
        assert_eq!(shown.structure().unwrap().user_id, user);
        assert!(shown.message().contains("No display name"));

        let fields = ProfileFields::new(None, Some("sam@example.com".into()));
        profile_set(env.config(), &user, &fields).await.unwrap();
        let fields = ProfileFields::new(Some("Sam".into()), None);
        let out = profile_set(env.config(), &user, &fields).await.unwrap();
        let profile = out.structure().unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Sam"));
        assert_eq!(profile.email.as_deref(), Some("sam@example.com"));

        let shown = profile_show(env.config(), &user).await.unwrap();
        assert_eq!(shown.message(), "Sam (test-user), sam@example.com");
    }

    #[tokio::test]
    async fn test_profile_set_requires_a_field() {
        let env = TestEnv::new().await;
        let err = profile_set(env.config(), &env.user(), &ProfileFields::default())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("Nothing to change"));
    }
}

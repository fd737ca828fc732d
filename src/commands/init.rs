use crate::args::InitArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::{UserId, UserProfile};
use crate::{utils, Config, Result};
use anyhow::Context;
use std::path::Path;
use std::str::FromStr;

/// Implements the `attend init` command.
///
/// Creates the home directory, `config.json` naming `user` (or a generated user) as the default
/// user, the database, and the user's profile from the fields in `args`.
///
/// # Errors
/// - Returns an error if the profile fields are invalid, in which case nothing is created.
/// - Returns an error if the home directory is already initialized.
pub async fn init(home: &Path, user: Option<&UserId>, args: &InitArgs) -> Result<Out<UserProfile>> {
    let update = args.profile().update();
    update.validate().pub_result(ErrorType::Request)?;

    let user = match user {
        Some(user) => user.clone(),
        None => UserId::from_str(&utils::generate_user_id()).pub_result(ErrorType::Request)?,
    };

    let config = Config::create(home, user.clone())
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;

    let mut profile = UserProfile::new(user.clone());
    update.apply(&mut profile);
    config
        .records(&user)
        .save_profile(&profile)
        .await
        .pub_result(ErrorType::Database)?;

    Ok(Out::new(
        format!(
            "Created the attend directory at {} for user '{user}'",
            config.root().display()
        ),
        profile,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ProfileFields;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_with_user() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("attend");
        let user = UserId::from_str("u-42").unwrap();
        let args = InitArgs::new(ProfileFields::new(Some("Sam".into()), None));

        let out = init(&home, Some(&user), &args).await.unwrap();
        assert_eq!(out.structure().unwrap().display_name.as_deref(), Some("Sam"));

        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.user_id(), &user);
        let stored = config.records(&user).profile().await.unwrap().unwrap();
        assert_eq!(stored.display_name.as_deref(), Some("Sam"));
    }

    #[tokio::test]
    async fn test_init_generates_user() {
        let dir = TempDir::new().unwrap();
        let args = InitArgs::new(ProfileFields::default());
        let out = init(dir.path(), None, &args).await.unwrap();
        let profile = out.structure().unwrap();
        assert!(profile.user_id.as_str().starts_with("local-"));
        assert!(profile.display_name.is_none());
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let dir = TempDir::new().unwrap();
        let args = InitArgs::new(ProfileFields::default());
        init(dir.path(), None, &args).await.unwrap();
        let err = init(dir.path(), None, &args).await.unwrap_err();
        assert!(format!("{err:#}").starts_with("config error"), "{err:#}");
    }

    #[tokio::test]
    async fn test_init_rejects_bad_email_before_creating_anything() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("attend");
        let args = InitArgs::new(ProfileFields::new(None, Some("nope".into())));
        let err = init(&home, None, &args).await.unwrap_err();
        assert!(format!("{err:#}").starts_with("request error"), "{err:#}");
        assert!(!home.exists());
    }
}

use crate::calendar::{ComplianceRules, YearMonth};
use crate::model::{LeaveRecord, OfficeTrackerRecord, ProfileUpdate, UserId, UserProfile};
use crate::store::{
    leave_id, office_tracker_id, profile_id, DocumentStore, LEAVE, OFFICE_TRACKER, USERS,
};
use crate::Result;
use anyhow::{ensure, Context};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

/// Typed access to the documents of one user.
///
/// A missing document is not an error: the office tracker and leave record fall back to the
/// defaults they are given and the profile comes back as `None`.
pub struct Records<'a> {
    store: &'a dyn DocumentStore,
    user: &'a UserId,
}

impl<'a> Records<'a> {
    pub fn new(store: &'a dyn DocumentStore, user: &'a UserId) -> Self {
        Self { store, user }
    }

    pub fn user(&self) -> &UserId {
        self.user
    }

    /// Loads the office tracker record for `month`, or a fresh one using `defaults`.
    pub async fn office(
        &self,
        month: YearMonth,
        defaults: ComplianceRules,
    ) -> Result<OfficeTrackerRecord> {
        let id = office_tracker_id(self.user, month);
        match self.load::<OfficeTrackerRecord>(OFFICE_TRACKER, &id).await? {
            Some(record) => {
                ensure!(
                    record.month() == month,
                    "The document {OFFICE_TRACKER}/{id} is for {} rather than {month}",
                    record.month()
                );
                Ok(record)
            }
            None => {
                debug!("No office tracker record for {month}, using defaults");
                Ok(OfficeTrackerRecord::new(month, defaults))
            }
        }
    }

    pub async fn save_office(&self, record: &OfficeTrackerRecord) -> Result<()> {
        let id = office_tracker_id(self.user, record.month());
        self.save(OFFICE_TRACKER, &id, record, false).await
    }

    /// Every office tracker record this user has saved, in month order.
    pub async fn office_history(&self) -> Result<Vec<OfficeTrackerRecord>> {
        let prefix = format!("{}_", self.user);
        let documents = self.store.list(OFFICE_TRACKER, &prefix).await?;
        // The prefix alone also matches users whose id extends this one, e.g. `a` and `a_b`.
        documents
            .into_iter()
            .filter(|(id, _)| id[prefix.len()..].parse::<YearMonth>().is_ok())
            .map(|(id, value)| {
                serde_json::from_value(value)
                    .with_context(|| format!("Unable to parse document {OFFICE_TRACKER}/{id}"))
            })
            .collect()
    }

    /// Loads the leave record, or an empty one with `default_allowance` available days.
    pub async fn leave(&self, default_allowance: u32) -> Result<LeaveRecord> {
        let id = leave_id(self.user);
        Ok(self
            .load::<LeaveRecord>(LEAVE, &id)
            .await?
            .unwrap_or_else(|| LeaveRecord::new(default_allowance)))
    }

    pub async fn save_leave(&self, record: &LeaveRecord) -> Result<()> {
        self.save(LEAVE, &leave_id(self.user), record, false).await
    }

    pub async fn profile(&self) -> Result<Option<UserProfile>> {
        self.load(USERS, &profile_id(self.user)).await
    }

    pub async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        ensure!(
            &profile.user_id == self.user,
            "Cannot save the profile of '{}' as '{}'",
            profile.user_id,
            self.user
        );
        self.save(USERS, &profile_id(self.user), profile, false)
            .await
    }

    /// Writes the fields set in `update`, creating the profile if it does not exist yet, and
    /// returns the profile as stored.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        update.validate()?;
        match self.profile().await? {
            None => {
                let mut profile = UserProfile::new(self.user.clone());
                update.apply(&mut profile);
                self.save_profile(&profile).await?;
                Ok(profile)
            }
            Some(_) => {
                let mut patch = serde_json::to_value(update)
                    .context("Unable to serialize the profile update")?;
                if let Value::Object(fields) = &mut patch {
                    fields.insert("updated_at".into(), Value::String(Utc::now().to_rfc3339()));
                }
                self.store
                    .set(USERS, &profile_id(self.user), patch, true)
                    .await?;
                self.profile()
                    .await?
                    .context("The profile disappeared while it was being updated")
            }
        }
    }

    async fn load<T>(&self, collection: &str, id: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        trace!("get {collection}/{id}");
        match self.store.get(collection, id).await? {
            Some(value) => serde_json::from_value(value)
                .with_context(|| format!("Unable to parse document {collection}/{id}"))
                .map(Some),
            None => Ok(None),
        }
    }

    async fn save<T>(&self, collection: &str, id: &str, record: &T, merge: bool) -> Result<()>
    where
        T: Serialize + Sync,
    {
        trace!("set {collection}/{id} (merge: {merge})");
        let value = serde_json::to_value(record)
            .with_context(|| format!("Unable to serialize document {collection}/{id}"))?;
        self.store.set(collection, id, value, merge).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{ComplianceCalculator, DateKey, ExclusionKind};
    use crate::store::MemoryStore;
    use std::str::FromStr;

    fn user() -> UserId {
        UserId::from_str("user-1").unwrap()
    }

    fn defaults() -> ComplianceRules {
        ComplianceRules {
            required_percentage: 60,
            exclude_weekends: true,
            exclude_bank_holidays: true,
        }
    }

    fn d(s: &str) -> DateKey {
        DateKey::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_absent_documents_use_defaults() {
        let store = MemoryStore::new();
        let user = user();
        let records = Records::new(&store, &user);
        let month = YearMonth::new(2026, 2).unwrap();

        let office = records.office(month, defaults()).await.unwrap();
        assert_eq!(office.rules(), defaults());
        assert!(office.office_days().is_empty());

        let leave = records.leave(25).await.unwrap();
        assert_eq!(leave.available_days(), 25);
        assert!(leave.entries().is_empty());

        assert!(records.profile().await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_office_round_trip_reproduces_summary() {
        let store = MemoryStore::new();
        let user = user();
        let records = Records::new(&store, &user);
        let month = YearMonth::new(2026, 2).unwrap();

        let mut office = records.office(month, defaults()).await.unwrap();
        for day in ["2026-02-02", "2026-02-03", "2026-02-04", "2026-02-05"] {
            office.tap(d(day)).unwrap();
        }
        office
            .add_exclusion(d("2026-02-06"), ExclusionKind::Holiday)
            .unwrap();
        records.save_office(&office).await.unwrap();

        let reloaded = records.office(month, defaults()).await.unwrap();
        assert_eq!(reloaded, office);
        let calc = ComplianceCalculator::default();
        assert_eq!(
            reloaded.evaluate(&calc, None),
            office.evaluate(&calc, None)
        );
        assert!(store
            .get(OFFICE_TRACKER, "user-1_2026-02")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_office_month_mismatch_is_an_error() {
        let store = MemoryStore::new();
        let user = user();
        let records = Records::new(&store, &user);
        let feb = OfficeTrackerRecord::new(YearMonth::new(2026, 2).unwrap(), defaults());
        let value = serde_json::to_value(&feb).unwrap();
        store
            .set(OFFICE_TRACKER, "user-1_2026-03", value, false)
            .await
            .unwrap();
        let result = records
            .office(YearMonth::new(2026, 3).unwrap(), defaults())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_broken_documents_are_errors() {
        let store = MemoryStore::new();
        let user = user();
        let records = Records::new(&store, &user);
        let doc = serde_json::json!({
            "month": "2026-02",
            "required_percentage": 250,
            "exclude_weekends": true,
            "exclude_bank_holidays": true,
            "office_days": ["2026-02-02", "2026-03-02"],
            "exclusions": {"2026-02-02": "excluded"}
        });
        store
            .set(OFFICE_TRACKER, "user-1_2026-02", doc, false)
            .await
            .unwrap();
        let err = records
            .office(YearMonth::new(2026, 2).unwrap(), defaults())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("between 0 and 100"), "{err:#}");
        assert!(records.office_history().await.is_err());

        let doc = serde_json::json!({
            "available_days": 25,
            "entries": [{"id": "x", "from_date": "2026-02-06", "to_date": "2026-02-02"}]
        });
        store.set(LEAVE, "user-1", doc, false).await.unwrap();
        let err = records.leave(25).await.unwrap_err();
        assert!(format!("{err:#}").contains("before it starts"), "{err:#}");
    }

    #[tokio::test]
    async fn test_office_history() {
        let store = MemoryStore::new();
        let user = user();
        let other = UserId::from_str("user-2").unwrap();
        let longer = UserId::from_str("user-1_b").unwrap();
        let record = OfficeTrackerRecord::new(YearMonth::new(2026, 4).unwrap(), defaults());
        Records::new(&store, &longer)
            .save_office(&record)
            .await
            .unwrap();
        for m in [3, 1, 2] {
            let record = OfficeTrackerRecord::new(YearMonth::new(2026, m).unwrap(), defaults());
            Records::new(&store, &user)
                .save_office(&record)
                .await
                .unwrap();
            Records::new(&store, &other)
                .save_office(&record)
                .await
                .unwrap();
        }
        let history = Records::new(&store, &user).office_history().await.unwrap();
        let months: Vec<String> = history.iter().map(|r| r.month().to_string()).collect();
        assert_eq!(months, vec!["2026-01", "2026-02", "2026-03"]);
    }

    #[tokio::test]
    async fn test_update_profile_creates_then_merges() {
        let store = MemoryStore::new();
        let user = user();
        let records = Records::new(&store, &user);

        let created = records
            .update_profile(&ProfileUpdate {
                display_name: Some("Sam".into()),
                email: None,
            })
            .await
            .unwrap();
        assert_eq!(created.display_name.as_deref(), Some("Sam"));

        let updated = records
            .update_profile(&ProfileUpdate {
                display_name: None,
                email: Some("sam@example.com".into()),
            })
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Sam"));
        assert_eq!(updated.email.as_deref(), Some("sam@example.com"));
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_save_profile_for_another_user_is_rejected() {
        let store = MemoryStore::new();
        let user = user();
        let records = Records::new(&store, &user);
        let profile = UserProfile::new(UserId::from_str("someone-else").unwrap());
        assert!(records.save_profile(&profile).await.is_err());
    }
}

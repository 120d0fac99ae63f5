mod support;

use smm_common::Money;
use smm_engine::{traits::SettingsStore, BonusConfig, SettingsApi};
use support::new_test_db;

#[tokio::test]
async fn reads_after_writes_observe_the_new_value() {
    let (db, _dir) = new_test_db().await;
    let api = SettingsApi::new(db.clone());

    assert!(api.get("maintenance.banner").await.unwrap().is_none());
    api.set("maintenance.banner", "Scheduled downtime at 02:00", Some("Shown on the dashboard")).await.unwrap();
    assert_eq!(api.get("maintenance.banner").await.unwrap().as_deref(), Some("Scheduled downtime at 02:00"));
    api.set("maintenance.banner", "All clear", None).await.unwrap();
    assert_eq!(api.get("maintenance.banner").await.unwrap().as_deref(), Some("All clear"));
}

#[tokio::test]
async fn bonus_config_defaults_apply_until_overridden() {
    let (db, _dir) = new_test_db().await;
    let api = SettingsApi::new(db.clone());

    let config = api.bonus_config().await.unwrap();
    assert_eq!(config, BonusConfig::default());
    assert!(config.enabled);
    assert_eq!(config.registration_amount, Money::from_units(5000));
    assert_eq!(config.unlock_threshold, Money::from_units(10_000));

    let custom = BonusConfig {
        enabled: false,
        registration_amount: Money::from_units(750),
        unlock_threshold: Money::from_units(2_000),
    };
    api.update_bonus_config(custom).await.unwrap();
    assert_eq!(api.bonus_config().await.unwrap(), custom);
}

#[tokio::test]
async fn malformed_amounts_fall_back_to_defaults() {
    let (db, _dir) = new_test_db().await;
    db.upsert_setting("bonus.registration_amount", "not-a-number", None).await.unwrap();
    let api = SettingsApi::new(db.clone());

    let config = api.bonus_config().await.unwrap();
    assert_eq!(config.registration_amount, BonusConfig::default().registration_amount);
}

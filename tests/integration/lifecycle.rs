//! Integration test: agent trust across simulated requests.
//!
//! Each `Browser` keeps a cookie jar and a server-side session, and drives
//! the service the way a web layer would:
//! 1. Read the inbound sealed value for the logged-in user's channel
//! 2. `begin` the request, run one operation, `finish` it
//! 3. Store the sealed value back into the jar

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use agent_trust::channel::{ChannelSecret, HmacChannel, SealedChannel};
use agent_trust::storage::{MemorySession, MemorySettingsStore, TrustSettingsStore};
use agent_trust::time;
use agent_trust::{
    AgentContext, AgentTrust, LoginRedirect, Principal, TrustConfig, TrustGuard, TrustRecord,
    TrustSettings, TrustToken, UserId,
};

type Service = AgentTrust<MemorySettingsStore, HmacChannel>;

fn secret() -> ChannelSecret {
    ChannelSecret::from_bytes(*b"integration-test-channel-secret!").unwrap()
}

fn service_with(config: TrustConfig) -> Service {
    AgentTrust::new(config, HmacChannel::new(secret()), MemorySettingsStore::new())
        .expect("config should validate")
}

fn service() -> Service {
    service_with(TrustConfig::default())
}

struct Browser {
    user: UserId,
    logged_in: bool,
    cookies: HashMap<String, String>,
    session: MemorySession,
}

impl Browser {
    fn new(user: &str) -> Self {
        Self {
            user: UserId::from(user),
            logged_in: false,
            cookies: HashMap::new(),
            session: MemorySession::new(),
        }
    }

    fn login(&mut self) {
        self.logged_in = true;
    }

    fn login_as(&mut self, user: &str) {
        self.user = UserId::from(user);
        self.logged_in = true;
    }

    fn logout(&mut self) {
        self.logged_in = false;
        self.session.clear();
    }

    fn principal(&self) -> Principal {
        if self.logged_in {
            Principal::User(self.user.clone())
        } else {
            Principal::Anonymous
        }
    }

    fn request_at<F>(&mut self, svc: &Service, now: DateTime<Utc>, op: F) -> AgentContext
    where
        F: FnOnce(&Service, &mut AgentContext, &mut MemorySession),
    {
        let principal = self.principal();
        let raw = principal
            .user_id()
            .and_then(|user| self.cookies.get(&svc.evaluator().channel_name(user)))
            .cloned();

        let mut ctx = svc
            .begin(principal, raw.as_deref(), &self.session, now)
            .expect("begin should succeed");
        op(svc, &mut ctx, &mut self.session);

        if let Some(sealed) = svc.finish(&ctx, now).expect("finish should succeed") {
            self.cookies.insert(sealed.name, sealed.value);
        }
        ctx
    }

    fn request<F>(&mut self, svc: &Service, op: F) -> AgentContext
    where
        F: FnOnce(&Service, &mut AgentContext, &mut MemorySession),
    {
        self.request_at(svc, time::now(), op)
    }

    fn get_restricted(&mut self, svc: &Service) -> Result<(), LoginRedirect> {
        let ctx = self.request(svc, |_, _, _| {});
        TrustGuard::new(svc.evaluator().config()).check(ctx.principal(), ctx.token(), "/restricted/")
    }

    fn trust(&mut self, svc: &Service) {
        self.request(svc, |svc, ctx, _| {
            svc.trust(ctx, None, time::now()).unwrap();
        });
    }

    fn trust_session(&mut self, svc: &Service) {
        self.request(svc, |svc, ctx, session| {
            svc.trust_for_session(ctx, session, time::now()).unwrap();
        });
    }

    fn revoke(&mut self, svc: &Service) {
        self.request(svc, |svc, ctx, _| svc.revoke(ctx));
    }

    fn revoke_others(&mut self, svc: &Service) {
        self.request(svc, |svc, ctx, _| svc.revoke_others(ctx).unwrap());
    }
}

// ── Request flows ───────────────────────────────────────────────────────────

#[test]
fn anonymous_is_redirected() {
    let svc = service();
    let mut alice = Browser::new("alice");

    let redirect = alice.get_restricted(&svc).unwrap_err();
    assert_eq!(redirect.location(), "/accounts/login/?next=/restricted/");
    assert!(alice.cookies.is_empty(), "anonymous requests seal nothing");
}

#[test]
fn authenticated_but_untrusted_is_redirected() {
    let svc = service();
    let mut alice = Browser::new("alice");
    alice.login();

    assert!(alice.get_restricted(&svc).is_err());
}

#[test]
fn trusted_agent_is_allowed() {
    let svc = service();
    let mut alice = Browser::new("alice");
    alice.login();
    alice.trust(&svc);

    assert!(alice.get_restricted(&svc).is_ok());
}

#[test]
fn revoked_agent_is_redirected() {
    let svc = service();
    let mut alice = Browser::new("alice");
    alice.login();
    alice.trust(&svc);
    alice.revoke(&svc);

    assert!(alice.get_restricted(&svc).is_err());
}

#[test]
fn trust_persists_across_logins() {
    let svc = service();
    let mut alice = Browser::new("alice");
    alice.login();
    alice.trust(&svc);
    alice.logout();
    alice.login();

    assert!(alice.get_restricted(&svc).is_ok());
}

#[test]
fn other_users_agent_is_not_trusted() {
    let svc = service();
    let mut alice = Browser::new("alice");
    let mut bob = Browser::new("bob");

    alice.login();
    alice.trust(&svc);
    alice.logout();

    bob.login();
    assert!(bob.get_restricted(&svc).is_err());
}

#[test]
fn shared_browser_keeps_users_apart() {
    let svc = service();
    let mut browser = Browser::new("alice");

    browser.login();
    browser.trust(&svc);
    browser.logout();

    browser.login_as("bob");
    assert!(browser.get_restricted(&svc).is_err());

    browser.logout();
    browser.login_as("alice");
    assert!(browser.get_restricted(&svc).is_ok());
}

#[test]
fn other_users_revocation_does_not_leak() {
    let svc = service();
    let mut alice = Browser::new("alice");
    let mut bob = Browser::new("bob");

    alice.login();
    alice.trust(&svc);

    bob.login();
    bob.trust(&svc);
    bob.revoke(&svc);
    bob.logout();

    assert!(alice.get_restricted(&svc).is_ok());
}

#[test]
fn revoke_others_revokes_every_other_agent() {
    let svc = service();
    let mut alice1 = Browser::new("alice");
    let mut alice2 = Browser::new("alice");

    alice1.login();
    alice1.trust(&svc);

    alice2.login();
    alice2.trust(&svc);
    alice2.revoke_others(&svc);

    assert!(alice1.get_restricted(&svc).is_err());
    assert!(alice2.get_restricted(&svc).is_ok());
}

#[test]
fn session_trust_ends_with_session() {
    let svc = service();
    let mut alice = Browser::new("alice");
    alice.login();
    alice.trust_session(&svc);

    assert!(alice.get_restricted(&svc).is_ok());

    alice.logout();
    alice.login();
    assert!(alice.get_restricted(&svc).is_err());
}

#[test]
fn session_trust_is_not_portable() {
    let svc = service();
    let mut alice1 = Browser::new("alice");
    let mut alice2 = Browser::new("alice");
    alice1.login();
    alice1.trust_session(&svc);

    alice2.login();
    alice2.cookies = alice1.cookies.clone();
    assert!(alice2.get_restricted(&svc).is_err());
}

#[test]
fn forged_cookie_for_other_user_is_rejected() {
    let svc = service();
    let mut alice = Browser::new("alice");
    alice.login();
    alice.trust(&svc);

    let alice_channel = svc.evaluator().channel_name(&UserId::from("alice"));
    let bob_channel = svc.evaluator().channel_name(&UserId::from("bob"));
    let value = alice.cookies[&alice_channel].clone();

    let mut bob = Browser::new("bob");
    bob.login();
    bob.cookies.insert(bob_channel, value);
    assert!(bob.get_restricted(&svc).is_err());
}

#[test]
fn inactivity_window_drops_idle_agent() {
    let svc = service_with(TrustConfig {
        inactivity_days: 30.0,
        ..TrustConfig::default()
    });
    let mut alice = Browser::new("alice");
    alice.login();

    let start = time::now();
    alice.request_at(&svc, start, |svc, ctx, _| {
        svc.trust(ctx, None, start).unwrap();
    });

    // Each visit re-seals, so regular use keeps the agent alive.
    let visit = start + TimeDelta::days(20);
    let ctx = alice.request_at(&svc, visit, |_, _, _| {});
    assert!(ctx.is_trusted());

    let idle = visit + TimeDelta::days(31);
    let ctx = alice.request_at(&svc, idle, |_, _, _| {});
    assert!(!ctx.is_trusted());
}

#[test]
fn user_inactivity_is_capped_by_global() {
    let svc = service_with(TrustConfig {
        inactivity_days: 10.0,
        ..TrustConfig::default()
    });
    let alice = UserId::from("alice");
    svc.store()
        .save(
            &alice,
            &TrustSettings::default().with_inactivity_days(Some(100.0)),
        )
        .unwrap();

    let mut browser = Browser::new("alice");
    browser.login();
    let start = time::now();
    browser.request_at(&svc, start, |svc, ctx, _| {
        svc.trust(ctx, None, start).unwrap();
    });

    let ctx = browser.request_at(&svc, start + TimeDelta::days(11), |_, _, _| {});
    assert!(!ctx.is_trusted());
}

#[test]
fn register_user_creates_settings() {
    let svc = service();
    let alice = UserId::from("alice");
    assert_eq!(svc.store().load(&alice).unwrap(), None);

    let settings = svc.register_user(&alice).unwrap();
    assert_eq!(settings, TrustSettings::default());
    assert!(svc.store().load(&alice).unwrap().is_some());
}

// ── Expiration and serial scenarios ─────────────────────────────────────────

/// Seal `token` for its owner and load it back under `settings`.
fn roundtrip(
    config: TrustConfig,
    token: &TrustToken,
    settings: &TrustSettings,
    now: DateTime<Utc>,
) -> TrustToken {
    let svc = service_with(config);
    let sealed = svc
        .evaluator()
        .store(token, settings, now)
        .unwrap()
        .expect("authenticated owners seal a token");
    svc.evaluator()
        .load(Some(&sealed.value), token.owner(), settings, None, now)
}

fn config_with_trust_days(days: Option<f64>) -> TrustConfig {
    TrustConfig {
        trust_days: days,
        ..TrustConfig::default()
    }
}

fn week_old_token(serial: i64) -> (TrustToken, DateTime<Utc>) {
    let now = time::now();
    let settings = TrustSettings::default().with_serial(serial);
    let token = TrustToken::trusted(
        Principal::user("alice"),
        &settings,
        None,
        now - TimeDelta::days(7),
    )
    .unwrap();
    (token, now)
}

#[test]
fn expired_by_global_only() {
    let (token, now) = week_old_token(1);
    let settings = TrustSettings::default().with_serial(1);

    let loaded = roundtrip(config_with_trust_days(Some(5.0)), &token, &settings, now);
    assert!(!loaded.is_trusted());
}

#[test]
fn expired_by_user_only() {
    let (token, now) = week_old_token(1);
    let settings = TrustSettings::default()
        .with_serial(1)
        .with_trust_days(Some(5.0));

    let loaded = roundtrip(TrustConfig::default(), &token, &settings, now);
    assert!(!loaded.is_trusted());
}

#[test]
fn user_limit_takes_precedence_when_shorter() {
    let (token, now) = week_old_token(1);
    let settings = TrustSettings::default()
        .with_serial(1)
        .with_trust_days(Some(5.0));

    let loaded = roundtrip(config_with_trust_days(Some(14.0)), &token, &settings, now);
    assert!(!loaded.is_trusted());
}

#[test]
fn global_limit_takes_precedence_when_shorter() {
    let (token, now) = week_old_token(1);
    let settings = TrustSettings::default()
        .with_serial(1)
        .with_trust_days(Some(14.0));

    let loaded = roundtrip(config_with_trust_days(Some(5.0)), &token, &settings, now);
    assert!(!loaded.is_trusted());
}

#[test]
fn not_expired_when_both_limits_are_longer() {
    let (token, now) = week_old_token(1);
    let settings = TrustSettings::default()
        .with_serial(1)
        .with_trust_days(Some(14.0));

    let loaded = roundtrip(config_with_trust_days(Some(14.0)), &token, &settings, now);
    assert!(loaded.is_trusted());
    assert_eq!(loaded.trusted_at(), token.trusted_at());
    assert_eq!(loaded.serial(), 1);
}

#[test]
fn token_limit_applies_on_its_own() {
    let now = time::now();
    let settings = TrustSettings::default();
    let token = TrustToken::trusted(
        Principal::user("alice"),
        &settings,
        Some(3.0),
        now - TimeDelta::days(4),
    )
    .unwrap();

    let loaded = roundtrip(TrustConfig::default(), &token, &settings, now);
    assert!(!loaded.is_trusted());
}

#[test]
fn stale_serial_is_revoked() {
    let (token, now) = week_old_token(1);
    let settings = TrustSettings::default().with_serial(2);

    let loaded = roundtrip(TrustConfig::default(), &token, &settings, now);
    assert!(!loaded.is_trusted());
    assert_eq!(loaded.serial(), -1);
}

#[test]
fn reauthorizing_after_revocation_uses_current_serial() {
    let now = time::now();
    let settings = TrustSettings::default().with_serial(2);
    let stale = TrustToken::trusted(
        Principal::user("alice"),
        &TrustSettings::default().with_serial(1),
        None,
        now - TimeDelta::days(1),
    )
    .unwrap();

    let loaded = roundtrip(TrustConfig::default(), &stale, &settings, now);
    assert!(!loaded.is_trusted());

    let fresh = TrustToken::trusted(loaded.owner().clone(), &settings, None, now).unwrap();
    let loaded = roundtrip(TrustConfig::default(), &fresh, &settings, now);
    assert!(loaded.is_trusted());
    assert_eq!(loaded.trusted_at(), Some(time::truncate_to_seconds(now)));
    assert_eq!(loaded.serial(), 2);
}

#[test]
fn untrusted_record_survives_roundtrip() {
    let now = time::now();
    let token = TrustToken::untrusted(Principal::user("alice"));

    let loaded = roundtrip(TrustConfig::default(), &token, &TrustSettings::default(), now);
    assert!(!loaded.is_trusted());
    assert_eq!(loaded.trusted_at(), None);
    assert_eq!(loaded.serial(), -1);
}

#[test]
fn newly_untrusted_keeps_diagnostics() {
    let svc = service();
    let now = time::now();
    let trusted_at = time::to_epoch_seconds(now);
    let alice = UserId::from("alice");
    let payload = format!(
        r#"{{"username":"alice","is_trusted":false,"trusted_at":{trusted_at},"serial":1}}"#
    );
    let max_age = svc
        .evaluator()
        .max_transport_age(&TrustSettings::default())
        .unwrap();
    let sealed = svc
        .evaluator()
        .channel()
        .seal(
            &svc.evaluator().channel_name(&alice),
            payload.as_bytes(),
            max_age,
            now,
        )
        .unwrap();

    let loaded = svc.evaluator().load(
        Some(&sealed),
        &Principal::User(alice),
        &TrustSettings::default(),
        None,
        now,
    );
    assert!(!loaded.is_trusted());
    assert_eq!(loaded.trusted_at(), Some(now));
    assert_eq!(loaded.serial(), 1);
}

#[test]
fn session_mismatch_is_untrusted() {
    let svc = service();
    let now = time::now();
    let settings = TrustSettings::default();
    let token =
        TrustToken::session_trusted(Principal::user("alice"), &settings, "abc", now).unwrap();
    let sealed = svc.evaluator().store(&token, &settings, now).unwrap().unwrap();

    let mismatched =
        svc.evaluator()
            .load(Some(&sealed.value), token.owner(), &settings, Some("xyz"), now);
    assert!(!mismatched.is_trusted());

    let matched =
        svc.evaluator()
            .load(Some(&sealed.value), token.owner(), &settings, Some("abc"), now);
    assert!(matched.is_trusted());
    assert_eq!(matched.session(), Some("abc"));
}

#[test]
fn legacy_record_with_null_fields_decodes() {
    let svc = service();
    let now = time::now();
    let alice = UserId::from("alice");
    let payload = br#"{"username":"alice","is_trusted":null,"trusted_at":null,"serial":null}"#;
    let max_age = svc
        .evaluator()
        .max_transport_age(&TrustSettings::default())
        .unwrap();
    let sealed = svc
        .evaluator()
        .channel()
        .seal(&svc.evaluator().channel_name(&alice), payload, max_age, now)
        .unwrap();

    let verification = svc
        .evaluator()
        .try_load(
            Some(&sealed),
            &Principal::User(alice),
            &TrustSettings::default(),
            None,
            now,
        )
        .unwrap();
    assert!(!verification.token.is_trusted());
    assert_eq!(verification.token.serial(), -1);
    assert_eq!(TrustRecord::from_json(payload).unwrap().session, None);
}

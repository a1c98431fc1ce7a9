mod common;

use axum::http::StatusCode;
use common::{register, send, spawn_app};
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::span::{Id, Record};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

/// Collects every `account_id` value recorded on a span after creation.
#[derive(Clone, Default)]
struct AccountIdCapture {
    seen: Arc<Mutex<Vec<i64>>>,
}

struct AccountIdVisitor<'a>(&'a Mutex<Vec<i64>>);

impl Visit for AccountIdVisitor<'_> {
    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == "account_id" {
            self.0.lock().unwrap().push(value);
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_i64(field, i64::try_from(value).unwrap());
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}

impl<S: tracing::Subscriber> Layer<S> for AccountIdCapture {
    fn on_record(&self, _span: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        values.record(&mut AccountIdVisitor(&self.seen));
    }
}

#[tokio::test]
async fn request_span_carries_authenticated_account() {
    let capture = AccountIdCapture::default();
    let subscriber = Registry::default().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let (_state, app) = spawn_app().await;
    let (token, account_id) = register(&app, "Acme", "owner@acme.test").await;

    let (status, _) = send(&app, "GET", "/api/inventory", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let seen = capture.seen.lock().unwrap().clone();
    assert!(seen.contains(&i64::from(account_id)), "recorded: {seen:?}");
}

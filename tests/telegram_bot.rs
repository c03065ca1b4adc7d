// Runs the polling loop against a local fake Bot API.

use reqwest::Client;
use serde_json::{json, Value};
use std::{
    collections::{HashMap, VecDeque},
    convert::Infallible,
    sync::{Arc, Mutex},
    time::Duration,
};
use survey_bot::{
    bot::{reply, Bot, BotApi, Handler, TransportError},
    retry::RetryPolicy,
    store::MemoryStore,
    sync::{queue, Synchronizer},
};
use tokio::time::{sleep, timeout, Instant};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use warp::{http::StatusCode, Filter};

fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,survey_bot=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[derive(Clone, Default)]
struct FakeTelegram {
    scripts: Arc<Mutex<HashMap<String, VecDeque<(u16, Value)>>>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
    sent: Arc<Mutex<Vec<(i64, String)>>>,
}

fn ok(result: Value) -> (u16, Value) {
    (200, json!({ "ok": true, "result": result }))
}

fn conflict() -> (u16, Value) {
    (
        409,
        json!({
            "ok": false,
            "error_code": 409,
            "description": "Conflict: terminated by other getUpdates request",
        }),
    )
}

fn bad_gateway() -> (u16, Value) {
    (
        502,
        json!({ "ok": false, "error_code": 502, "description": "Bad Gateway" }),
    )
}

fn text_update(update_id: i64, chat_id: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": { "message_id": update_id, "chat": { "id": chat_id }, "text": text },
    })
}

impl FakeTelegram {
    fn script(&self, method: &str, responses: Vec<(u16, Value)>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .extend(responses);
    }

    fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    async fn handle(&self, method: String, body: Value) -> (u16, Value) {
        *self.calls.lock().unwrap().entry(method.clone()).or_default() += 1;
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&method)
            .and_then(VecDeque::pop_front);
        if let Some(response) = scripted {
            return response;
        }

        match method.as_str() {
            "sendMessage" => {
                let chat_id = body["chat_id"].as_i64().unwrap();
                let text = body["text"].as_str().unwrap().to_string();
                self.sent.lock().unwrap().push((chat_id, text));
                ok(json!({ "message_id": 1 }))
            }
            "getUpdates" => {
                // stand-in for a long poll that times out empty
                sleep(Duration::from_millis(20)).await;
                ok(json!([]))
            }
            _ => ok(json!(true)),
        }
    }
}

/// Start the fake Bot API and return its base URL.
fn start(fake: FakeTelegram) -> String {
    let routes = warp::post()
        .and(warp::path!(String / String))
        .and(warp::body::json())
        .and_then(move |_token: String, method: String, body: Value| {
            let fake = fake.clone();
            async move {
                let (status, body) = fake.handle(method, body).await;
                let status = StatusCode::from_u16(status).unwrap();
                Ok::<_, Infallible>(warp::reply::with_status(warp::reply::json(&body), status))
            }
        });
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{addr}")
}

fn bot(api_url: &str) -> Bot {
    let store = Arc::new(MemoryStore::new());
    let (queue, _writer) = queue::spawn(Synchronizer::new(store.clone(), "disk:/survey.csv"), 4);
    Bot::new(
        BotApi::new(Client::new(), api_url, "42:token"),
        Handler::new(store, queue),
        0,
    )
}

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(20),
        max_backoff: Duration::from_millis(100),
    }
}

/// Wait until the fake has received `count` replies.
async fn replies(fake: &FakeTelegram, count: usize) -> Vec<(i64, String)> {
    loop {
        let sent = fake.sent();
        if sent.len() >= count {
            return sent;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn startup_conflicts_are_retried_with_backoff() {
    init_tracing();
    let fake = FakeTelegram::default();
    fake.script(
        "getUpdates",
        vec![conflict(), conflict(), ok(json!([text_update(1, 7, "/test")]))],
    );
    let api = start(fake.clone());
    let bot = bot(&api);
    let policy = policy(5);

    let began = Instant::now();
    let sent = tokio::select! {
        res = bot.run(&policy) => panic!("bot stopped: {res:?}"),
        sent = timeout(Duration::from_secs(5), replies(&fake, 1)) => sent.unwrap(),
    };

    // two failed attempts wait 20ms then 40ms
    assert!(began.elapsed() >= Duration::from_millis(60));
    assert_eq!(fake.calls("deleteWebhook"), 3);
    assert_eq!(sent, vec![(7, reply::DISK_OK.to_string())]);
}

#[tokio::test]
async fn persistent_conflict_stops_the_bot() {
    init_tracing();
    let fake = FakeTelegram::default();
    fake.script("getUpdates", vec![conflict(); 10]);
    let api = start(fake.clone());
    let bot = bot(&api);

    let err = timeout(Duration::from_secs(5), bot.run(&policy(3)))
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "chat transport did not start after 3 attempt(s)"
    );
    assert!(err.downcast_ref::<TransportError>().unwrap().is_conflict());
    assert_eq!(fake.calls("getUpdates"), 3);
    assert!(fake.sent().is_empty());
}

#[tokio::test]
async fn bad_credentials_fail_without_retrying() {
    init_tracing();
    let fake = FakeTelegram::default();
    fake.script(
        "deleteWebhook",
        vec![(
            401,
            json!({ "ok": false, "error_code": 401, "description": "Unauthorized" }),
        )],
    );
    let api = start(fake.clone());
    let bot = bot(&api);

    let err = timeout(Duration::from_secs(5), bot.run(&policy(5)))
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "chat transport did not start after 1 attempt(s)"
    );
    assert_eq!(fake.calls("deleteWebhook"), 1);
    assert_eq!(fake.calls("getUpdates"), 0);
}

#[tokio::test]
async fn gateway_error_while_reconnecting_keeps_polling() {
    init_tracing();
    let fake = FakeTelegram::default();
    fake.script("deleteWebhook", vec![ok(json!(true)), bad_gateway()]);
    fake.script(
        "getUpdates",
        vec![
            ok(json!([])),
            conflict(),
            ok(json!([text_update(5, 9, "/start")])),
        ],
    );
    let api = start(fake.clone());
    let bot = bot(&api);
    let policy = policy(5);

    let sent = tokio::select! {
        res = bot.run(&policy) => panic!("bot stopped: {res:?}"),
        sent = timeout(Duration::from_secs(5), replies(&fake, 1)) => sent.unwrap(),
    };

    assert_eq!(sent, vec![(9, reply::WELCOME.to_string())]);
    // startup, the failed reconnect and the one that worked
    assert_eq!(fake.calls("deleteWebhook"), 3);
}

mod common;

use std::time::Duration;

use common::{collect, names, RecordingSleeper, Reply, ScriptedClient};
use study_chat::{
    error::FailureKind,
    generator::{LinearBackoff, ResponseGenerator},
    registry::ModelRegistry,
};

const QUOTA: Reply = Reply::Status(429, "429 quota exceeded");

fn generator(sleeper: &RecordingSleeper) -> ResponseGenerator<LinearBackoff, RecordingSleeper> {
    ResponseGenerator::new(3, LinearBackoff::default()).with_sleeper(sleeper.clone())
}

#[tokio::test]
async fn first_model_success_returns_its_stream_without_sleeping() {
    let client = ScriptedClient::new()
        .with_model("m-flash", vec![Reply::Stream(vec!["Hola", " mundo"])])
        .with_model("m-pro", vec![Reply::Stream(vec!["unused"])]);
    let sleeper = RecordingSleeper::default();

    let answer = generator(&sleeper)
        .generate_with_models(&client, &names(&["m-flash", "m-pro"]), "prompt")
        .await
        .unwrap();

    assert_eq!(answer.model, "m-flash");
    assert_eq!(answer.tries, 1);
    assert_eq!(collect(answer.stream).await, "Hola mundo");
    assert_eq!(client.calls(), vec!["m-flash"]);
    assert!(sleeper.pauses().is_empty());
}

#[tokio::test]
async fn quota_on_flash_falls_through_to_pro_after_one_pause() {
    let client = ScriptedClient::new()
        .with_model("m-flash", vec![QUOTA])
        .with_model("m-pro", vec![Reply::Stream(vec!["respuesta"])]);
    let sleeper = RecordingSleeper::default();

    let answer = generator(&sleeper)
        .generate_with_models(&client, &names(&["m-flash", "m-pro"]), "prompt")
        .await
        .unwrap();

    assert_eq!(answer.model, "m-pro");
    assert_eq!(answer.tries, 2);
    assert_eq!(client.calls(), vec!["m-flash", "m-pro"]);
    assert_eq!(sleeper.pauses(), vec![Duration::from_secs(5)]);
    assert_eq!(collect(answer.stream).await, "respuesta");
}

#[tokio::test]
async fn quota_everywhere_exhausts_attempts_with_linear_pauses() {
    let client = ScriptedClient::new()
        .with_model("m-flash", vec![QUOTA])
        .with_model("m-pro", vec![Reply::Status(403, "RESOURCE_EXHAUSTED")]);
    let sleeper = RecordingSleeper::default();

    let failure = generator(&sleeper)
        .generate_with_models(&client, &names(&["m-flash", "m-pro"]), "prompt")
        .await
        .unwrap_err();

    let secs = |s| Duration::from_secs(s);
    assert_eq!(failure.tries, 6);
    assert_eq!(
        sleeper.pauses(),
        vec![secs(5), secs(5), secs(10), secs(10), secs(15), secs(15)]
    );
    assert_eq!(failure.slept, secs(60));
    assert_eq!(
        failure.last_error.map(|e| e.kind()),
        Some(FailureKind::QuotaExceeded)
    );
}

#[tokio::test]
async fn empty_list_uses_fallback_models_and_unclassified_errors_never_pause() {
    let client = ScriptedClient::new()
        .with_model("gemini-1.5-flash", vec![Reply::Transport("connection reset")])
        .with_model("gemini-pro", vec![Reply::Status(500, "internal")]);
    let sleeper = RecordingSleeper::default();

    let failure = generator(&sleeper)
        .generate_with_models(&client, &[], "prompt")
        .await
        .unwrap_err();

    assert_eq!(failure.tries, 6);
    assert_eq!(
        client.calls(),
        names(&[
            "gemini-1.5-flash",
            "gemini-pro",
            "gemini-1.5-flash",
            "gemini-pro",
            "gemini-1.5-flash",
            "gemini-pro",
        ])
    );
    assert!(sleeper.pauses().is_empty());
    assert_eq!(failure.slept, Duration::ZERO);
}

#[tokio::test]
async fn missing_model_is_skipped_immediately() {
    let client = ScriptedClient::new().with_model("m-pro", vec![Reply::Stream(vec!["ok"])]);
    let sleeper = RecordingSleeper::default();

    let answer = generator(&sleeper)
        .generate_with_models(&client, &names(&["m-gone", "m-pro"]), "prompt")
        .await
        .unwrap();

    assert_eq!(answer.model, "m-pro");
    assert!(sleeper.pauses().is_empty());
}

#[tokio::test]
async fn model_recovering_on_second_attempt_is_used() {
    let client = ScriptedClient::new().with_model(
        "m-flash",
        vec![QUOTA, Reply::Stream(vec!["second time lucky"])],
    );
    let sleeper = RecordingSleeper::default();

    let answer = generator(&sleeper)
        .generate_with_models(&client, &names(&["m-flash"]), "prompt")
        .await
        .unwrap();

    assert_eq!(answer.tries, 2);
    assert_eq!(sleeper.pauses(), vec![Duration::from_secs(5)]);
    assert_eq!(collect(answer.stream).await, "second time lucky");
}

#[tokio::test]
async fn custom_backoff_step_is_honoured() {
    let client = ScriptedClient::new().with_model("m", vec![QUOTA]);
    let sleeper = RecordingSleeper::default();

    let failure = ResponseGenerator::new(2, LinearBackoff::new(Duration::from_millis(100)))
        .with_sleeper(sleeper.clone())
        .generate_with_models(&client, &names(&["m"]), "prompt")
        .await
        .unwrap_err();

    assert_eq!(failure.tries, 2);
    assert_eq!(
        sleeper.pauses(),
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
}

#[tokio::test]
async fn registry_ranking_drives_generation_and_is_fetched_once() {
    let client = ScriptedClient::new()
        .with_listing(&["gemini-1.5-pro", "gemini-2.0-flash", "gemini-pro-vision"])
        .with_model("gemini-2.0-flash", vec![QUOTA])
        .with_model("gemini-1.5-pro", vec![Reply::Stream(vec!["ok"])]);
    let registry = ModelRegistry::new(names(&["gemini-1.5-flash", "gemini-pro"]));
    let sleeper = RecordingSleeper::default();
    let generator = generator(&sleeper);

    let first = generator.generate(&client, &registry, "q1").await.unwrap();
    let second = generator.generate(&client, &registry, "q2").await.unwrap();

    assert_eq!(first.model, "gemini-1.5-pro");
    assert_eq!(second.model, "gemini-1.5-pro");
    assert_eq!(client.list_calls(), 1);
    assert_eq!(
        registry.cached().unwrap(),
        &names(&["gemini-2.0-flash", "gemini-1.5-pro", "gemini-1.5-flash", "gemini-pro"])[..]
    );
}

#[tokio::test]
async fn registry_falls_back_when_listing_fails() {
    let client = ScriptedClient::new();
    let registry = ModelRegistry::new(names(&["gemini-1.5-flash", "gemini-pro"]));

    assert_eq!(
        registry.models(&client).await,
        &names(&["gemini-1.5-flash", "gemini-pro"])[..]
    );
    registry.models(&client).await;
    assert_eq!(client.list_calls(), 1);
}

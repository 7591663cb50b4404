use prompt_service::{
    PromptCatalog, PromptData, PromptError, PromptService, ProviderEndpoints, ProviderKeys,
    ProviderKind, Rule,
};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CATALOG: &str = r#"{
    "lead_summary": {
        "description": "Summarise a lead",
        "prompt": "Return the lead as JSON.",
        "config": {"provider": "openai", "model": "gpt-4o-mini"},
        "validation": {
            "required_fields": ["message"],
            "at_least_one": ["email", "phone"],
            "min_length": {"message": 5}
        },
        "response_format": "json"
    },
    "greeting": {
        "prompt": "Say hello."
    },
    "blank": {
        "prompt": "   "
    }
}"#;

fn service(server: &MockServer) -> PromptService {
    let keys = ProviderKeys {
        openai: Some(SecretString::new("openai-key".into())),
        gemini: Some(SecretString::new("gemini-key".into())),
    };
    PromptService::new(PromptCatalog::from_json(CATALOG).unwrap(), keys).with_endpoints(
        ProviderEndpoints {
            openai: server.uri(),
            gemini: server.uri(),
        },
    )
}

fn data(pairs: &[(&str, &str)]) -> PromptData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_execute_openai_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Message: Call me back"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "```json\n{\"intent\": \"callback\"}\n```"}}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let service = service(&server);
    let input = data(&[("message", "Call me back"), ("phone", "0600000000")]);

    let first = service.execute_prompt("lead_summary", &input).await.unwrap();
    assert_eq!(first, json!({"intent": "callback"}));

    // Second call reuses the cached provider
    let second = service.execute_prompt("lead_summary", &input).await.unwrap();
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_execute_gemini_prompt_plain_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Hello there"}]}}]
        })))
        .mount(&server)
        .await;

    let result = service(&server)
        .execute_prompt("greeting", &PromptData::new())
        .await
        .unwrap();
    assert_eq!(result, json!({"response": "Hello there"}));
}

#[tokio::test]
async fn test_validation_errors_stop_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let service = service(&server);

    let err = service
        .execute_prompt("lead_summary", &data(&[("email", "a@b.c")]))
        .await
        .unwrap_err();
    match err {
        PromptError::Validation(v) => {
            assert_eq!(v.field, "message");
            assert_eq!(v.rule, Rule::Required);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = service
        .execute_prompt("lead_summary", &data(&[("message", "Call me back")]))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "At least one of these fields must be filled: email, phone"
    );

    let err = service
        .execute_prompt("lead_summary", &data(&[("message", "hi"), ("email", "a@b.c")]))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "The field 'message' must contain at least 5 characters"
    );
}

#[tokio::test]
async fn test_unknown_and_empty_prompts() {
    let server = MockServer::start().await;
    let service = service(&server);

    assert!(matches!(
        service.execute_prompt("missing", &PromptData::new()).await,
        Err(PromptError::UnknownPrompt(name)) if name == "missing"
    ));
    assert!(matches!(
        service.execute_prompt("blank", &PromptData::new()).await,
        Err(PromptError::EmptyPrompt)
    ));
}

#[tokio::test]
async fn test_missing_key_is_reported() {
    let server = MockServer::start().await;
    let service = PromptService::new(
        PromptCatalog::from_json(CATALOG).unwrap(),
        ProviderKeys::default(),
    )
    .with_endpoints(ProviderEndpoints {
        openai: server.uri(),
        gemini: server.uri(),
    });

    assert!(matches!(
        service.execute_prompt("greeting", &PromptData::new()).await,
        Err(PromptError::NotConfigured(_))
    ));
    assert!(service.provider_info().iter().all(|p| !p.configured));
}

#[test]
fn test_prompt_and_provider_info() {
    let service = PromptService::new(
        PromptCatalog::from_json(CATALOG).unwrap(),
        ProviderKeys {
            openai: None,
            gemini: Some(SecretString::new("gemini-key".into())),
        },
    );

    assert_eq!(service.available_prompts(), vec!["blank", "greeting", "lead_summary"]);

    let info = service.prompt_info("lead_summary").unwrap();
    assert_eq!(info.config.provider, ProviderKind::OpenAi);
    assert_eq!(info.config.model, "gpt-4o-mini");
    assert_eq!(info.response_format, "json");
    assert_eq!(service.prompt_info("greeting").unwrap().response_format, "text");

    let providers = service.provider_info();
    assert!(providers
        .iter()
        .any(|p| p.provider == ProviderKind::Gemini && p.configured));
    assert!(providers
        .iter()
        .any(|p| p.provider == ProviderKind::OpenAi && !p.configured));
}

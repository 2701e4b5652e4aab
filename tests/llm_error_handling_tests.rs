use lesson_quiz::{
    Difficulty, GenerationRequest, LLMProviderType, LLMService, RecordKind, RecoveryConfig,
    StrategyKind,
};

// Nothing listens on the discard port, so requests fail fast with connection refused.
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn unreachable_service(provider: LLMProviderType) -> LLMService {
    LLMService::new_with_provider(
        "invalid-key".to_string(),
        Some(UNREACHABLE.to_string()),
        provider,
        None,
        RecoveryConfig::default(),
    )
}

#[tokio::test]
async fn test_unreachable_provider_falls_back_to_synthesis() {
    let request = GenerationRequest::new("Smart pointers", Difficulty::Hard).unwrap();

    for provider in [LLMProviderType::OpenAI, LLMProviderType::Gemini] {
        let service = unreachable_service(provider);

        let question = service
            .generate_question(&request, "Write one question about smart pointers.")
            .await;
        assert_eq!(question.kind, RecordKind::Question, "{:?}", provider);
        assert_eq!(question.strategy, StrategyKind::Synthesis);
        assert!(question.degraded);

        let lesson = service
            .generate_lesson(&request, "Write a lesson about smart pointers.")
            .await;
        assert_eq!(lesson.kind, RecordKind::Lesson, "{:?}", provider);
        assert!(lesson.degraded);
        assert!(lesson.record.as_lesson().unwrap().title.contains("Smart pointers"));
    }
}

#[tokio::test]
async fn test_concurrent_service_creation() {
    use tokio::task;

    let handles: Vec<_> = (0..8)
        .map(|i| {
            task::spawn(async move {
                let provider = if i % 2 == 0 {
                    LLMProviderType::OpenAI
                } else {
                    LLMProviderType::Gemini
                };
                let service = unreachable_service(provider);
                let request = GenerationRequest::new(format!("Topic {}", i), Difficulty::Easy).unwrap();
                service.recover_only("", &request, &lesson_quiz::SchemaDescriptor::question())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let content = handle.await.unwrap();
        assert_eq!(content.topic, format!("Topic {}", i));
        assert!(content.degraded);
    }
}

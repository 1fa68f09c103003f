//! Pipeline scenarios against a mock website and in-process collaborators.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use outreach_core::prompts::{
    COMPANY_SUMMARY_SYSTEM_PROMPT, LEAD_SUMMARY_SYSTEM_PROMPT, curation_system_prompt,
};
use outreach_core::{
    GenerationRequest, Pipeline, ProfileSource, SilentProgress, TextGenerator,
};
use outreach_crawler::PageFetcher;
use outreach_retrieval::Embedder;
use outreach_shared::{OutreachError, PipelineConfig, Result, Workspace};
use outreach_storage::{
    ALL_LINKS, Artifact, ArtifactCache, ArtifactKey, ArtifactStore, FsStore, LEAD_SUMMARY,
    MemoryStore, PERSONALIZED_MESSAGE, SUMMARY_LINKS,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Answers by prompt kind and records every call.
#[derive(Default)]
struct ScriptedGenerator {
    calls: Mutex<Vec<String>>,
    fail_message: AtomicBool,
    malformed_curation: AtomicBool,
}

impl ScriptedGenerator {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let kind = if system == curation_system_prompt(CURATED_LIMIT) {
            "curate"
        } else if system == COMPANY_SUMMARY_SYSTEM_PROMPT {
            "company"
        } else if system == LEAD_SUMMARY_SYSTEM_PROMPT {
            "lead"
        } else {
            "message"
        };
        self.calls.lock().unwrap().push(kind.to_string());

        match kind {
            "curate" if self.malformed_curation.load(Ordering::SeqCst) => {
                Ok("I think the about page is best.".to_string())
            }
            "curate" => {
                let mut links: Vec<String> = serde_json::from_str(user).unwrap();
                links.reverse();
                Ok(format!(
                    "Here you go: {}",
                    serde_json::json!({ "useful_links": links })
                ))
            }
            "company" => Ok(format!("Summary:\nRocket Brew roasts coffee.\n\n{user}")),
            "lead" => Ok("Summary:\nJane Doe leads growth and loves coffee.".to_string()),
            _ if self.fail_message.load(Ordering::SeqCst) => {
                Err(OutreachError::Generation("rate limited".into()))
            }
            _ => {
                assert!(system.contains("Friendly"));
                assert!(user.contains("Jane Doe leads growth"));
                assert!(user.contains("met at the expo"));
                Ok("Hi Jane, great to connect!".to_string())
            }
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct FakeProfiles {
    calls: AtomicUsize,
}

#[async_trait]
impl ProfileSource for FakeProfiles {
    async fn fetch_profile(&self, lead_id: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("firstName:\nJane\n\nlastName:\nDoe\nPosts:\nhello from {lead_id}"))
    }
}

struct LetterEmbedder;

#[async_trait]
impl Embedder for LetterEmbedder {
    fn model(&self) -> &str {
        "letters"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 26];
                for c in t.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                    v[(c - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    pipeline: Pipeline,
    generator: Arc<ScriptedGenerator>,
    profiles: Arc<FakeProfiles>,
}

const CURATED_LIMIT: usize = 1;

fn harness(store: Arc<dyn ArtifactStore>) -> Harness {
    let generator = Arc::new(ScriptedGenerator::default());
    let profiles = Arc::new(FakeProfiles::default());
    let config = PipelineConfig {
        chunk_size: 60,
        chunk_overlap: 10,
        min_chunk_length: 5,
        max_curated_links: CURATED_LIMIT,
        ..PipelineConfig::default()
    };

    let pipeline = Pipeline::new(
        Arc::new(ArtifactCache::new(store)),
        PageFetcher::new().unwrap().allow_private_hosts(true),
        generator.clone(),
        profiles.clone(),
        Arc::new(LetterEmbedder),
        config,
    )
    .unwrap();

    Harness {
        pipeline,
        generator,
        profiles,
    }
}

async fn coffee_site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><h1>Rocket Brew</h1><p>Cold brew coffee delivered fast.</p>
               <a href="/about">About</a><a href="https://external.com/b">Partner</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><p>We roast small batches of coffee every morning.</p></body></html>",
        ))
        .mount(&server)
        .await;
    server
}

fn request(server: &MockServer) -> GenerationRequest {
    GenerationRequest {
        entity_url: Url::parse(&server.uri()).unwrap(),
        lead_id: "jane-doe".to_string(),
        style: "Friendly".to_string(),
        notes: "met at the expo".to_string(),
    }
}

async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

fn temp_data_dir() -> PathBuf {
    std::env::temp_dir().join(format!("outreach_pipeline_{}", Uuid::now_v7()))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generates_message_and_persists_every_artifact() {
    let server = coffee_site().await;
    let data_dir = temp_data_dir();
    let h = harness(Arc::new(FsStore::new(&data_dir)));

    let result = h
        .pipeline
        .generate_message(&request(&server), &SilentProgress)
        .await
        .unwrap();

    assert_eq!(result.message, "Hi Jane, great to connect!");
    assert_eq!(result.model, "scripted");
    assert!(!result.from_cache);
    assert_eq!(
        h.generator.calls(),
        vec!["curate", "company", "lead", "message"]
    );

    let port = Url::parse(&server.uri()).unwrap().port().unwrap();
    let entity_dir = data_dir.join(format!("127_0_0_1__{port}"));
    let lead_dir = entity_dir.join("jane-doe");

    let all_links: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(entity_dir.join("all_links.json")).unwrap())
            .unwrap();
    assert_eq!(
        all_links,
        serde_json::json!({"all_links": [server.uri(), format!("{}/about", server.uri())]})
    );

    for name in [
        "summary_links.json",
        "website_info.txt",
        "website_summary_info.txt",
        "company_summary_and_facts.txt",
        "RAG/faiss_index/index.json",
    ] {
        assert!(entity_dir.join(name).exists(), "missing {name}");
    }
    for name in [
        "lead_info.txt",
        "lead_summary_and_facts.txt",
        "personalized_message.txt",
    ] {
        assert!(lead_dir.join(name).exists(), "missing {name}");
    }

    let site_text = std::fs::read_to_string(entity_dir.join("website_info.txt")).unwrap();
    assert!(site_text.contains("Cold brew coffee delivered fast."));
    assert!(site_text.contains("We roast small batches"));
}

#[tokio::test]
async fn existing_message_short_circuits_everything() {
    let server = coffee_site().await;
    let store = Arc::new(MemoryStore::new());
    let h = harness(store.clone());

    h.pipeline
        .generate_message(&request(&server), &SilentProgress)
        .await
        .unwrap();
    let requests_after_first = server.received_requests().await.unwrap().len();

    let again = h
        .pipeline
        .generate_message(&request(&server), &SilentProgress)
        .await
        .unwrap();

    assert!(again.from_cache);
    assert_eq!(again.message, "Hi Jane, great to connect!");
    assert_eq!(h.generator.calls().len(), 4);
    assert_eq!(h.profiles.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_after_first
    );
}

#[tokio::test]
async fn cached_link_set_skips_the_crawl() {
    let server = coffee_site().await;
    let seed = Url::parse(&server.uri()).unwrap();
    let entity = Workspace::for_entity(&seed).unwrap();

    let store = Arc::new(MemoryStore::new());
    let cached = ALL_LINKS.encode(&vec![server.uri()]).unwrap();
    store
        .store(&ArtifactKey::new(&entity, ALL_LINKS.name()), &cached)
        .await
        .unwrap();

    let h = harness(store);
    let scraped = h.pipeline.scrape(&seed, &SilentProgress).await.unwrap();

    assert_eq!(scraped.links, vec![server.uri()]);
    // Only the content fetch touched the site: one request for the seed page.
    assert_eq!(requests_to(&server, "/").await, 1);
    assert_eq!(requests_to(&server, "/about").await, 0);
}

#[tokio::test]
async fn failed_run_resumes_from_the_failing_stage() {
    let server = coffee_site().await;
    let store = Arc::new(MemoryStore::new());
    let h = harness(store.clone());
    h.generator.fail_message.store(true, Ordering::SeqCst);

    let err = h
        .pipeline
        .generate_message(&request(&server), &SilentProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, OutreachError::Generation(_)));

    let lead = Workspace::for_entity(&Url::parse(&server.uri()).unwrap())
        .unwrap()
        .lead("jane-doe")
        .unwrap();
    let cache = h.pipeline.cache();
    assert!(cache.exists(&lead, &LEAD_SUMMARY).await.unwrap());
    assert!(!cache.exists(&lead, &PERSONALIZED_MESSAGE).await.unwrap());

    let site_requests = server.received_requests().await.unwrap().len();
    h.generator.fail_message.store(false, Ordering::SeqCst);

    let result = h
        .pipeline
        .generate_message(&request(&server), &SilentProgress)
        .await
        .unwrap();

    assert_eq!(result.message, "Hi Jane, great to connect!");
    assert_eq!(
        h.generator.calls(),
        vec!["curate", "company", "lead", "message", "message"]
    );
    assert_eq!(h.profiles.calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), site_requests);
}

#[tokio::test]
async fn malformed_curation_stops_after_the_crawl() {
    let server = coffee_site().await;
    let h = harness(Arc::new(MemoryStore::new()));
    h.generator.malformed_curation.store(true, Ordering::SeqCst);

    let seed = Url::parse(&server.uri()).unwrap();
    let err = h.pipeline.scrape(&seed, &SilentProgress).await.unwrap_err();
    assert!(matches!(err, OutreachError::MalformedResponse(_)));

    let entity = Workspace::for_entity(&seed).unwrap();
    let cache = h.pipeline.cache();
    assert!(cache.exists(&entity, &ALL_LINKS).await.unwrap());
    assert!(!cache.exists(&entity, &SUMMARY_LINKS).await.unwrap());
}

#[tokio::test]
async fn curated_links_are_a_subset_within_the_limit() {
    let server = coffee_site().await;
    let h = harness(Arc::new(MemoryStore::new()));
    let seed = Url::parse(&server.uri()).unwrap();

    let scraped = h.pipeline.scrape(&seed, &SilentProgress).await.unwrap();

    assert!(scraped.curated_links.len() <= h.pipeline.config().max_curated_links);
    assert_eq!(scraped.curated_links, vec![format!("{}/about", server.uri())]);
    assert!(scraped.curated_links.iter().all(|l| scraped.links.contains(l)));
    assert!(scraped.full_text_chars >= scraped.curated_text_chars);
    assert!(scraped.links.iter().all(|l| !l.contains("external.com")));
}

#[tokio::test]
async fn query_before_scrape_is_a_precondition_error() {
    let h = harness(Arc::new(MemoryStore::new()));
    let url = Url::parse("https://example.com").unwrap();

    let err = h.pipeline.query(&url, "coffee", 3).await.unwrap_err();

    assert!(matches!(err, OutreachError::MissingPrecondition(_)));
}

#[tokio::test]
async fn query_after_scrape_returns_site_chunks() {
    let server = coffee_site().await;
    let h = harness(Arc::new(MemoryStore::new()));
    let seed = Url::parse(&server.uri()).unwrap();
    h.pipeline.scrape(&seed, &SilentProgress).await.unwrap();

    let chunks = h.pipeline.query(&seed, "roast coffee", 2).await.unwrap();

    assert!(!chunks.is_empty() && chunks.len() <= 2);
    assert!(chunks.iter().all(|c| c.trim().chars().count() >= 5));
}

#[tokio::test]
async fn invalid_lead_id_is_rejected_before_any_work() {
    let server = coffee_site().await;
    let h = harness(Arc::new(MemoryStore::new()));
    let mut req = request(&server);
    req.lead_id = "../escape".to_string();

    let err = h
        .pipeline
        .generate_message(&req, &SilentProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, OutreachError::Validation { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

//! Guided exercises. Each challenge carries a ready-made request that starting it loads
//! into the builder.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::assist::{
    request_from_value, validate_creativity, AssistError, CompletionProvider, CompletionRequest,
};
use crate::code_formatter::strip_code_fence;
use crate::db::Store;
use crate::key_value::KeyValue;
use crate::types::{HttpMethod, RequestSnapshot};

/// Store key holding generated challenges, newest first
pub const GENERATED_CHALLENGES_KEY: &str = "generatedChallenges";

const MIN_XP: u32 = 50;
const MAX_XP: u32 = 150;

const CHALLENGE_PROMPT: &str = "You are an AI mentor for an API learning platform. Generate a new, \
unique API challenge for a student, based on a common public API such as JSONPlaceholder. The \
challenge must be a single API request that can be solved in an API playground.
Answer with one JSON object and nothing else, using exactly these keys:
- \"id\": unique slug, e.g. \"fetch-user-posts\"
- \"title\": a catchy title
- \"description\": a brief, engaging description of the task
- \"xp\": experience points between 50 and 150
- \"request\": {\"method\": GET|POST|PUT|PATCH|DELETE, \"url\": string, \"body\"?: string, \
\"headers\"?: [{\"key\", \"value\"}], \"queryParams\"?: [{\"key\", \"value\"}]}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChallengeStatus {
    #[default]
    Start,
    InProgress,
    Completed,
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChallengeStatus::Start => "Start",
            ChallengeStatus::InProgress => "In Progress",
            ChallengeStatus::Completed => "Completed",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub description: String,
    pub xp: u32,
    /// Percent complete, 0-100
    pub progress: u8,
    pub status: ChallengeStatus,
    pub request: RequestSnapshot,
    pub generated: bool,
}

impl Challenge {
    fn builtin(
        id: &str,
        title: &str,
        description: &str,
        xp: u32,
        status: ChallengeStatus,
        progress: u8,
        request: RequestSnapshot,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            xp,
            progress,
            status,
            request,
            generated: false,
        }
    }
}

/// The challenge list, generated ones first
#[derive(Debug, Clone)]
pub struct ChallengeBoard {
    challenges: Vec<Challenge>,
}

impl Default for ChallengeBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeBoard {
    pub fn new() -> Self {
        Self {
            challenges: builtin_challenges(),
        }
    }

    /// Prepend a generated challenge. Returns false when its id is already taken.
    pub fn add_generated(&mut self, challenge: Challenge) -> bool {
        if self.get(&challenge.id).is_some() {
            log::debug!("Skipping duplicate challenge {}", challenge.id);
            return false;
        }
        self.challenges.insert(0, challenge);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Challenge> {
        self.challenges.iter()
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    /// Built-in challenges plus the generated ones kept in `store`.
    pub fn load(store: &Store) -> anyhow::Result<Self> {
        let mut board = Self::new();
        let Some(raw) = store.get(GENERATED_CHALLENGES_KEY)? else {
            return Ok(board);
        };

        match serde_json::from_str::<Vec<Challenge>>(&raw) {
            Ok(generated) => {
                for challenge in generated.into_iter().rev() {
                    board.add_generated(challenge);
                }
            }
            Err(e) => log::warn!("Discarding unreadable generated challenges: {}", e),
        }
        Ok(board)
    }

    /// Persist the generated challenges; built-in ones are never stored.
    pub fn save(&self, store: &Store) -> anyhow::Result<()> {
        let generated: Vec<&Challenge> = self.challenges.iter().filter(|c| c.generated).collect();
        if generated.is_empty() {
            return store.remove(GENERATED_CHALLENGES_KEY);
        }
        let json = serde_json::to_string(&generated)?;
        store.set(GENERATED_CHALLENGES_KEY, &json)
    }
}

fn builtin_challenges() -> Vec<Challenge> {
    let mut post = RequestSnapshot::new(
        HttpMethod::POST,
        "https://jsonplaceholder.typicode.com/posts",
    );
    post.body = "{\n  \"title\": \"foo\",\n  \"body\": \"bar\",\n  \"userId\": 1\n}".to_string();

    let mut protected = RequestSnapshot::new(HttpMethod::GET, "https://api.example.com/protected");
    protected.headers = vec![KeyValue::new("Authorization", "Bearer YOUR_TOKEN")];

    let mut comments = RequestSnapshot::new(
        HttpMethod::GET,
        "https://jsonplaceholder.typicode.com/comments",
    );
    comments.query_params = vec![KeyValue::new("postId", "1")];

    vec![
        Challenge::builtin(
            "get-request",
            "The GET Requestor",
            "Learn how to fetch data from a public API using a simple GET request.",
            50,
            ChallengeStatus::Completed,
            100,
            RequestSnapshot::new(HttpMethod::GET, "https://jsonplaceholder.typicode.com/posts/1"),
        ),
        Challenge::builtin(
            "post-master",
            "POST Master",
            "Create a new resource on a mock server by sending data with a POST request.",
            75,
            ChallengeStatus::InProgress,
            40,
            post,
        ),
        Challenge::builtin(
            "header-wizard",
            "Header Wizard",
            "Authenticate your request by correctly setting the Authorization header.",
            100,
            ChallengeStatus::Start,
            0,
            protected,
        ),
        Challenge::builtin(
            "path-param-pro",
            "Path Parameter Pro",
            "Fetch a specific resource by using path parameters in your API request URL.",
            60,
            ChallengeStatus::Start,
            0,
            RequestSnapshot::new(
                HttpMethod::GET,
                "https://jsonplaceholder.typicode.com/comments/10",
            ),
        ),
        Challenge::builtin(
            "query-ninja",
            "Query Ninja",
            "Filter and sort data from an API by using query parameters.",
            80,
            ChallengeStatus::Start,
            0,
            comments,
        ),
        Challenge::builtin(
            "error-handler",
            "Error Handler",
            "Intentionally trigger a 404 Not Found error and handle the response gracefully.",
            120,
            ChallengeStatus::Start,
            0,
            RequestSnapshot::new(
                HttpMethod::GET,
                "https://jsonplaceholder.typicode.com/posts/99999",
            ),
        ),
    ]
}

/// Ask the model for a fresh challenge.
pub async fn generate_challenge(
    provider: &dyn CompletionProvider,
    creativity: Option<f32>,
) -> Result<Challenge, AssistError> {
    validate_creativity(creativity)?;

    let reply = provider
        .complete(CompletionRequest {
            prompt: CHALLENGE_PROMPT.to_string(),
            temperature: creativity,
        })
        .await?;

    parse_challenge(&reply)
}

fn parse_challenge(text: &str) -> Result<Challenge, AssistError> {
    let value: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| AssistError::InvalidOutput(format!("response is not JSON: {}", e)))?;

    let text_field = |name: &str| -> Result<String, AssistError> {
        value
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AssistError::InvalidOutput(format!("missing {}", name)))
    };

    let id = text_field("id")?;
    let title = text_field("title")?;
    let description = text_field("description")?;
    let xp = value
        .get("xp")
        .and_then(Value::as_f64)
        .ok_or_else(|| AssistError::InvalidOutput("missing xp".to_string()))?;
    let request = value
        .get("request")
        .ok_or_else(|| AssistError::InvalidOutput("missing request".to_string()))
        .and_then(request_from_value)?;

    Ok(Challenge {
        id,
        title,
        description,
        xp: (xp.round().max(0.0) as u32).clamp(MIN_XP, MAX_XP),
        progress: 0,
        status: ChallengeStatus::Start,
        request,
        generated: true,
    })
}

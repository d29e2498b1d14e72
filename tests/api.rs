use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

use lumblog::application::admin::activity::AdminActivityService;
use lumblog::application::admin::posts::AdminPostService;
use lumblog::application::admin::taxonomy::AdminTaxonomyService;
use lumblog::application::auth::AdminGate;
use lumblog::application::content::ContentService;
use lumblog::application::notifications::{
    MailError, Mailer, NotificationDispatcher, PublishNotifier,
};
use lumblog::application::repos::{
    ActivityRepo, CreatePostParams, HealthRepo, IssueTokenParams, NotificationRecipient,
    PostQueryFilter, PostWithTaxonomy, PostsRepo, PostsWriteRepo, RedeemOutcome,
    RelatedCandidate, RepoError, SitemapPostEntry, SubscribersRepo, TaxonomyRepo,
    TaxonomyWriteRepo, UpdatePostParams, UpsertTaxonomyParams,
};
use lumblog::application::sitemap::SitemapService;
use lumblog::application::subscriptions::SubscriptionService;
use lumblog::domain::entities::{
    ActivityLogRecord, PostRecord, SubscriberRecord, SubscriptionTokenRecord, TaxonomyRecord,
    TranslationRecord,
};
use lumblog::domain::recommendation::PostFeatures;
use lumblog::domain::types::{Locale, PostStatus, TaxonomyKind, TokenType};
use lumblog::infra::http::{ApiState, HttpState, RouterState, build_router};
use lumblog::presentation::email::EmailMessage;

const ADMIN_KEY: &str = "letmein";
const BASE_URL: &str = "http://blog.test";

#[derive(Default)]
struct StoreState {
    posts: Vec<PostRecord>,
    categories: Vec<TaxonomyRecord>,
    tags: Vec<TaxonomyRecord>,
    links: Vec<(TaxonomyKind, Uuid, Uuid)>,
    subscribers: Vec<SubscriberRecord>,
    tokens: Vec<SubscriptionTokenRecord>,
    activity: Vec<ActivityLogRecord>,
}

impl StoreState {
    fn entries(&self, kind: TaxonomyKind) -> &Vec<TaxonomyRecord> {
        match kind {
            TaxonomyKind::Category => &self.categories,
            TaxonomyKind::Tag => &self.tags,
        }
    }

    fn entries_mut(&mut self, kind: TaxonomyKind) -> &mut Vec<TaxonomyRecord> {
        match kind {
            TaxonomyKind::Category => &mut self.categories,
            TaxonomyKind::Tag => &mut self.tags,
        }
    }

    fn linked_ids(&self, kind: TaxonomyKind, post_id: Uuid) -> Vec<Uuid> {
        self.links
            .iter()
            .filter(|(link_kind, post, _)| *link_kind == kind && *post == post_id)
            .map(|(_, _, id)| *id)
            .collect()
    }

    fn linked(&self, kind: TaxonomyKind, post_id: Uuid) -> Vec<TaxonomyRecord> {
        let ids = self.linked_ids(kind, post_id);
        self.entries(kind)
            .iter()
            .filter(|record| ids.contains(&record.id))
            .cloned()
            .collect()
    }

    fn with_taxonomy(&self, post: &PostRecord) -> PostWithTaxonomy {
        PostWithTaxonomy {
            post: post.clone(),
            categories: self.linked(TaxonomyKind::Category, post.id),
            tags: self.linked(TaxonomyKind::Tag, post.id),
        }
    }

    fn published_newest_first(&self, locale: Locale) -> Vec<&PostRecord> {
        let mut posts: Vec<&PostRecord> = self
            .posts
            .iter()
            .filter(|post| post.locale == locale && post.status.is_published())
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        posts
    }
}

#[derive(Default)]
struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    fn seed_post(&self, slug: &str, locale: Locale, title: &str, age_minutes: i64) -> Uuid {
        let now = OffsetDateTime::now_utc() - Duration::minutes(age_minutes);
        let id = Uuid::new_v4();
        self.state.lock().unwrap().posts.push(PostRecord {
            id,
            slug: slug.to_string(),
            locale,
            title: title.to_string(),
            summary: None,
            content: format!("# {title}"),
            status: PostStatus::Published,
            created_at: now,
            updated_at: now,
        });
        id
    }

    fn seed_taxonomy(
        &self,
        kind: TaxonomyKind,
        slug: &str,
        name: &str,
        translations: &[(Locale, &str)],
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.state
            .lock()
            .unwrap()
            .entries_mut(kind)
            .push(TaxonomyRecord {
                id,
                slug: slug.to_string(),
                name: name.to_string(),
                translations: translations
                    .iter()
                    .map(|(locale, name)| TranslationRecord {
                        locale: *locale,
                        name: name.to_string(),
                    })
                    .collect(),
            });
        id
    }

    fn link(&self, kind: TaxonomyKind, post_id: Uuid, taxonomy_id: Uuid) {
        self.state
            .lock()
            .unwrap()
            .links
            .push((kind, post_id, taxonomy_id));
    }

    fn seed_subscriber(&self, email: &str, active: bool) -> Uuid {
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();
        self.state.lock().unwrap().subscribers.push(SubscriberRecord {
            id,
            email: email.to_string(),
            is_active: active,
            created_at: now,
            updated_at: now,
        });
        id
    }

    fn seed_token(&self, subscriber_id: Uuid, token: &str, expires_in: Duration) {
        let now = OffsetDateTime::now_utc();
        self.state
            .lock()
            .unwrap()
            .tokens
            .push(SubscriptionTokenRecord {
                id: Uuid::new_v4(),
                token: token.to_string(),
                subscriber_id,
                token_type: TokenType::Unsubscribe,
                expires_at: now + expires_in,
                used_at: None,
                created_at: now,
            });
    }

    fn newest_token_for(&self, email: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let subscriber = state
            .subscribers
            .iter()
            .find(|subscriber| subscriber.email == email)?;
        state
            .tokens
            .iter()
            .filter(|token| token.subscriber_id == subscriber.id)
            .max_by_key(|token| token.created_at)
            .map(|token| token.token.clone())
    }

    fn is_active(&self, email: &str) -> Option<bool> {
        self.state
            .lock()
            .unwrap()
            .subscribers
            .iter()
            .find(|subscriber| subscriber.email == email)
            .map(|subscriber| subscriber.is_active)
    }

    fn activity_actions(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .activity
            .iter()
            .map(|record| (record.actor.clone(), record.action.clone()))
            .collect()
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_published(
        &self,
        locale: Locale,
        filter: &PostQueryFilter,
        limit: u32,
    ) -> Result<Vec<PostWithTaxonomy>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .published_newest_first(locale)
            .into_iter()
            .map(|post| state.with_taxonomy(post))
            .filter(|post| {
                filter.category_slug.as_deref().is_none_or(|slug| {
                    post.categories.iter().any(|category| category.slug == slug)
                })
            })
            .filter(|post| {
                filter
                    .tag_slug
                    .as_deref()
                    .is_none_or(|slug| post.tags.iter().any(|tag| tag.slug == slug))
            })
            .take(limit as usize)
            .collect())
    }

    async fn find_published_by_slug(
        &self,
        locale: Locale,
        slug: &str,
    ) -> Result<Option<PostWithTaxonomy>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .published_newest_first(locale)
            .into_iter()
            .find(|post| post.slug == slug)
            .map(|post| state.with_taxonomy(post)))
    }

    async fn list_all(&self) -> Result<Vec<PostWithTaxonomy>, RepoError> {
        let state = self.state.lock().unwrap();
        let mut posts: Vec<&PostRecord> = state.posts.iter().collect();
        posts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(posts
            .into_iter()
            .map(|post| state.with_taxonomy(post))
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn find_by_slug_and_locale(
        &self,
        slug: &str,
        locale: Locale,
    ) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .posts
            .iter()
            .find(|post| post.slug == slug && post.locale == locale)
            .cloned())
    }

    async fn load_features(&self, id: Uuid) -> Result<Option<PostFeatures>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.posts.iter().find(|post| post.id == id).map(|post| {
            PostFeatures::new(
                state.linked_ids(TaxonomyKind::Category, id),
                state.linked_ids(TaxonomyKind::Tag, id),
                post.title.clone(),
            )
        }))
    }

    async fn list_related_candidates(
        &self,
        locale: Locale,
        exclude: Uuid,
    ) -> Result<Vec<RelatedCandidate>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .published_newest_first(locale)
            .into_iter()
            .filter(|post| post.id != exclude)
            .map(|post| RelatedCandidate {
                id: post.id,
                slug: post.slug.clone(),
                title: post.title.clone(),
                summary: post.summary.clone(),
                categories: state.linked(TaxonomyKind::Category, post.id),
                features: PostFeatures::new(
                    state.linked_ids(TaxonomyKind::Category, post.id),
                    state.linked_ids(TaxonomyKind::Tag, post.id),
                    post.title.clone(),
                ),
            })
            .collect())
    }

    async fn list_sitemap_entries(&self) -> Result<Vec<SitemapPostEntry>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .posts
            .iter()
            .filter(|post| post.status.is_published())
            .map(|post| SitemapPostEntry {
                slug: post.slug.clone(),
                locale: post.locale,
                updated_at: post.updated_at,
            })
            .collect())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = PostRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            locale: params.locale,
            title: params.title,
            summary: params.summary,
            content: params.content,
            status: params.status,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().posts.push(record.clone());
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        if let Some(title) = params.title {
            post.title = title;
        }
        if let Some(content) = params.content {
            post.content = content;
        }
        if let Some(status) = params.status {
            post.status = status;
        }
        post.summary = params.summary;
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }

    async fn replace_post_taxonomy(
        &self,
        kind: TaxonomyKind,
        post_id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        state
            .links
            .retain(|(link_kind, post, _)| !(*link_kind == kind && *post == post_id));
        for id in ids {
            state.links.push((kind, post_id, *id));
        }
        Ok(())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        let before = state.posts.len();
        state.posts.retain(|post| post.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        state.links.retain(|(_, post, _)| *post != id);
        Ok(())
    }
}

#[async_trait]
impl TaxonomyRepo for MemoryStore {
    async fn list(&self, kind: TaxonomyKind) -> Result<Vec<TaxonomyRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        let mut records = state.entries(kind).clone();
        records.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn find_by_slug(
        &self,
        kind: TaxonomyKind,
        slug: &str,
    ) -> Result<Option<TaxonomyRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .entries(kind)
            .iter()
            .find(|record| record.slug == slug)
            .cloned())
    }
}

#[async_trait]
impl TaxonomyWriteRepo for MemoryStore {
    async fn upsert(
        &self,
        kind: TaxonomyKind,
        params: UpsertTaxonomyParams,
    ) -> Result<TaxonomyRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let entries = state.entries_mut(kind);
        let index = match entries.iter().position(|record| record.slug == params.slug) {
            Some(index) => index,
            None => {
                entries.push(TaxonomyRecord {
                    id: Uuid::new_v4(),
                    slug: params.slug.clone(),
                    name: params.slug.clone(),
                    translations: Vec::new(),
                });
                entries.len() - 1
            }
        };

        let record = &mut entries[index];
        if let Some(name) = params.name {
            record.name = name;
        }
        for translation in params.translations {
            match record
                .translations
                .iter_mut()
                .find(|existing| existing.locale == translation.locale)
            {
                Some(existing) => existing.name = translation.name,
                None => record.translations.push(translation),
            }
        }
        Ok(record.clone())
    }
}

#[async_trait]
impl SubscribersRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<SubscriberRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscribers
            .iter()
            .find(|subscriber| subscriber.email == email)
            .cloned())
    }

    async fn create_subscriber(&self, email: &str) -> Result<SubscriberRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = SubscriberRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().subscribers.push(record.clone());
        Ok(record)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<SubscriberRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let subscriber = state
            .subscribers
            .iter_mut()
            .find(|subscriber| subscriber.id == id)
            .ok_or(RepoError::NotFound)?;
        subscriber.is_active = active;
        subscriber.updated_at = OffsetDateTime::now_utc();
        Ok(subscriber.clone())
    }

    async fn issue_token(
        &self,
        params: IssueTokenParams,
    ) -> Result<SubscriptionTokenRecord, RepoError> {
        let record = SubscriptionTokenRecord {
            id: Uuid::new_v4(),
            token: params.token,
            subscriber_id: params.subscriber_id,
            token_type: TokenType::Unsubscribe,
            expires_at: params.expires_at,
            used_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.state.lock().unwrap().tokens.push(record.clone());
        Ok(record)
    }

    async fn find_token(
        &self,
        token: &str,
    ) -> Result<Option<SubscriptionTokenRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tokens
            .iter()
            .find(|record| record.token == token)
            .cloned())
    }

    async fn redeem_token(
        &self,
        token_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<RedeemOutcome, RepoError> {
        let mut state = self.state.lock().unwrap();
        let token = state
            .tokens
            .iter_mut()
            .find(|record| record.id == token_id)
            .ok_or(RepoError::NotFound)?;
        if token.used_at.is_some() {
            return Ok(RedeemOutcome::AlreadyUsed);
        }
        token.used_at = Some(now);
        let subscriber_id = token.subscriber_id;
        if let Some(subscriber) = state
            .subscribers
            .iter_mut()
            .find(|subscriber| subscriber.id == subscriber_id)
        {
            subscriber.is_active = false;
        }
        Ok(RedeemOutcome::Redeemed)
    }

    async fn list_notification_recipients(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<NotificationRecipient>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.is_active)
            .map(|subscriber| NotificationRecipient {
                subscriber_id: subscriber.id,
                email: subscriber.email.clone(),
                unsubscribe_token: state
                    .tokens
                    .iter()
                    .filter(|token| {
                        token.subscriber_id == subscriber.id
                            && token.used_at.is_none()
                            && token.expires_at > now
                    })
                    .max_by_key(|token| token.created_at)
                    .map(|token| token.token.clone()),
            })
            .collect())
    }

    async fn count_active(&self) -> Result<u64, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.is_active)
            .count() as u64)
    }
}

#[async_trait]
impl ActivityRepo for MemoryStore {
    async fn append_log(&self, record: ActivityLogRecord) -> Result<(), RepoError> {
        self.state.lock().unwrap().activity.push(record);
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    fn recipients(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(to, _)| to.clone())
            .collect()
    }

    fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, subject)| subject.clone())
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, message: &EmailMessage) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), message.subject.clone()));
        Ok(())
    }
}

struct Harness {
    app: Router,
    store: Arc<MemoryStore>,
    mailer: Arc<RecordingMailer>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::default());
    let mailer = Arc::new(RecordingMailer::default());

    let activity = AdminActivityService::new(store.clone());
    let notifier: Arc<dyn PublishNotifier> = Arc::new(NotificationDispatcher::new(
        store.clone(),
        mailer.clone(),
        BASE_URL,
        "Test Blog",
    ));

    let state = RouterState {
        http: HttpState {
            sitemap: Arc::new(SitemapService::new(store.clone(), BASE_URL)),
            health: store.clone(),
        },
        api: ApiState {
            content: Arc::new(ContentService::new(store.clone(), store.clone())),
            subscriptions: Arc::new(SubscriptionService::new(
                store.clone(),
                mailer.clone(),
                BASE_URL,
                "Test Blog",
                30,
            )),
            posts: Arc::new(AdminPostService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                activity.clone(),
                Some(notifier),
            )),
            taxonomy: Arc::new(AdminTaxonomyService::new(
                store.clone(),
                store.clone(),
                activity,
            )),
            gate: Arc::new(AdminGate::new(Some(ADMIN_KEY.to_string()), None)),
            session_max_age: std::time::Duration::from_secs(3600),
        },
    };

    Harness {
        app: build_router(state),
        store,
        mailer,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn admin(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("admin_key={ADMIN_KEY}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn latest_posts_are_newest_first_with_localized_categories() {
    let h = harness();
    let rust = h.store.seed_taxonomy(
        TaxonomyKind::Category,
        "rust",
        "Rust",
        &[(Locale::Fr, "Rouille")],
    );
    let older = h.store.seed_post("older", Locale::Fr, "Ancien", 30);
    h.store.seed_post("newer", Locale::Fr, "Nouveau", 5);
    h.store.seed_post("english", Locale::En, "English", 1);
    h.store.link(TaxonomyKind::Category, older, rust);

    let (status, body) = send_json(&h.app, get("/api/content/fr/posts")).await;
    assert_eq!(status, StatusCode::OK);
    let slugs: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["newer", "older"]);
    assert_eq!(body[1]["categories"][0]["name"], "Rouille");

    let (_, filtered) = send_json(&h.app, get("/api/content/fr/posts?category=rust&take=10")).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["slug"], "older");
}

#[tokio::test]
async fn unknown_locale_is_not_found() {
    let h = harness();
    let (status, body) = send_json(&h.app, get("/api/content/xx/posts")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn featured_post_is_null_when_nothing_is_published() {
    let h = harness();
    let (status, body) = send_json(&h.app, get("/api/content/en/posts/featured")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());
}

#[tokio::test]
async fn post_detail_ranks_related_posts_by_shared_taxonomy() {
    let h = harness();
    let caching = h
        .store
        .seed_taxonomy(TaxonomyKind::Category, "caching", "Caching", &[]);
    let redis = h.store.seed_taxonomy(TaxonomyKind::Tag, "redis", "Redis", &[]);

    let anchor = h.store.seed_post("anchor", Locale::En, "Cache basics", 10);
    let strong = h.store.seed_post("strong", Locale::En, "Unrelated words", 20);
    let weak = h.store.seed_post("weak", Locale::En, "Other things", 5);
    h.store.seed_post("french", Locale::Fr, "Cache basics", 1);

    h.store.link(TaxonomyKind::Category, anchor, caching);
    h.store.link(TaxonomyKind::Tag, anchor, redis);
    h.store.link(TaxonomyKind::Category, strong, caching);
    h.store.link(TaxonomyKind::Tag, strong, redis);
    h.store.link(TaxonomyKind::Tag, weak, redis);

    let (status, body) = send_json(&h.app, get("/api/content/en/posts/anchor")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "anchor");
    assert!(
        body["content_html"]
            .as_str()
            .unwrap()
            .contains("<h1>Cache basics</h1>")
    );
    let related: Vec<&str> = body["related"]
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["slug"].as_str().unwrap())
        .collect();
    assert_eq!(related, vec!["strong", "weak"]);

    let (missing, body) = send_json(&h.app, get("/api/content/en/posts/nope")).await;
    assert_eq!(missing, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "post not found");
}

#[tokio::test]
async fn post_detail_renders_markdown_body() {
    let h = harness();
    let id = h.store.seed_post("rendered", Locale::En, "Rendered", 1);
    {
        let mut state = h.store.state.lock().unwrap();
        let post = state.posts.iter_mut().find(|post| post.id == id).unwrap();
        post.content =
            "# Warm caches\n\n```rust\nlet hit = cache.get(&key);\n```\n\n<script>alert(1)</script>"
                .to_string();
    }

    let (status, body) = send_json(&h.app, get("/api/content/en/posts/rendered")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["content"].as_str().unwrap().starts_with("# Warm caches"));

    let html = body["content_html"].as_str().unwrap();
    assert!(html.contains("<h1>Warm caches</h1>"), "{html}");
    assert!(
        html.contains("<pre><code class=\"language-rust\">let hit = cache.get(&amp;key);\n</code></pre>"),
        "{html}"
    );
    assert!(!html.contains("<script"), "{html}");
}

#[tokio::test]
async fn localized_taxonomy_falls_back_to_default_name() {
    let h = harness();
    h.store.seed_taxonomy(
        TaxonomyKind::Tag,
        "async",
        "Async",
        &[(Locale::Es, "Asíncrono")],
    );

    let (_, es) = send_json(&h.app, get("/api/content/es/tags/async")).await;
    assert_eq!(es["name"], "Asíncrono");
    let (_, pt) = send_json(&h.app, get("/api/content/pt/tags/async")).await;
    assert_eq!(pt["name"], "Async");

    let (status, body) = send_json(&h.app, get("/api/content/en/tags/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "tag not found");
}

#[tokio::test]
async fn subscribe_then_unsubscribe_once() {
    let h = harness();

    let (status, body) = send_json(
        &h.app,
        json_request(
            Method::POST,
            "/api/subscribe",
            json!({ "email": "reader@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Successfully subscribed! Please check your email for confirmation."
    );
    assert_eq!(h.mailer.recipients(), vec!["reader@example.com"]);

    let token = h.store.newest_token_for("reader@example.com").unwrap();
    let uri = format!("/api/unsubscribe?token={token}");

    let (status, body) = send_json(&h.app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully unsubscribed from the newsletter.");
    assert_eq!(h.store.is_active("reader@example.com"), Some(false));

    let (status, body) = send_json(&h.app, get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This unsubscribe link has already been used");
}

#[tokio::test]
async fn subscribe_rejects_bad_and_duplicate_addresses() {
    let h = harness();
    h.store.seed_subscriber("taken@example.com", true);

    let (status, body) = send_json(
        &h.app,
        json_request(Method::POST, "/api/subscribe", json!({ "email": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid email address");

    let (status, body) = send_json(
        &h.app,
        json_request(
            Method::POST,
            "/api/subscribe",
            json!({ "email": "taken@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You are already subscribed to our newsletter.");
    assert!(h.mailer.recipients().is_empty());
}

#[tokio::test]
async fn resubscribing_reactivates_the_subscriber() {
    let h = harness();
    h.store.seed_subscriber("back@example.com", false);

    let (status, _) = send_json(
        &h.app,
        json_request(
            Method::POST,
            "/api/subscribe",
            json!({ "email": "back@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.store.is_active("back@example.com"), Some(true));
}

#[tokio::test]
async fn unsubscribe_rejects_missing_unknown_and_expired_tokens() {
    let h = harness();
    let subscriber = h.store.seed_subscriber("late@example.com", true);
    h.store.seed_token(subscriber, "stale", Duration::days(-1));

    let (status, body) = send_json(&h.app, get("/api/unsubscribe")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unsubscribe token is required");

    let (status, body) = send_json(&h.app, get("/api/unsubscribe?token=unknown")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid unsubscribe token");

    let (status, body) = send_json(&h.app, get("/api/unsubscribe?token=stale")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unsubscribe token has expired");
    assert_eq!(h.store.is_active("late@example.com"), Some(true));
}

#[tokio::test]
async fn admin_routes_require_credentials() {
    let h = harness();

    for request in [
        get("/api/posts"),
        get("/api/subscribers/count"),
        json_request(Method::POST, "/api/categories", json!({ "slug": "x" })),
        json_request(Method::POST, "/api/posts", json!({ "title": "x" })),
    ] {
        let (status, body) = send_json(&h.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "message": "Unauthorized" }));
    }

    let wrong_key = Request::builder()
        .uri("/api/posts")
        .header(header::COOKIE, "admin_key=guess")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send_json(&h.app, wrong_key).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(&h.app, get("/api/categories")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_session_sets_and_clears_cookie() {
    let h = harness();

    let (status, _, body) = send(
        &h.app,
        json_request(Method::POST, "/api/admin/session", json!({ "key": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Invalid admin key");

    let (status, headers, _) = send(
        &h.app,
        json_request(Method::POST, "/api/admin/session", json!({ "key": ADMIN_KEY })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    let cookie = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with(&format!("admin_key={ADMIN_KEY}")));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=3600"));

    let (status, headers, _) = send(
        &h.app,
        Request::builder()
            .method(Method::DELETE)
            .uri("/api/admin/session")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cookie = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn publishing_a_post_notifies_active_subscribers_once() {
    let h = harness();
    h.store
        .seed_taxonomy(TaxonomyKind::Category, "news", "News", &[]);
    let active = h.store.seed_subscriber("active@example.com", true);
    h.store.seed_token(active, "tok-active", Duration::days(10));
    h.store.seed_subscriber("gone@example.com", false);

    let (status, body) = send_json(
        &h.app,
        admin(
            Method::POST,
            "/api/posts",
            Some(json!({
                "title": "Launch Day",
                "content": "We shipped.",
                "status": "published",
                "categories": ["news"],
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["post"]["slug"], "launch-day");
    assert_eq!(body["post"]["locale"], "en");
    assert_eq!(h.mailer.recipients(), vec!["active@example.com"]);
    assert!(h.mailer.subjects()[0].contains("Launch Day"));

    let (status, _) = send_json(
        &h.app,
        admin(
            Method::POST,
            "/api/posts",
            Some(json!({
                "title": "Launch Day",
                "content": "We shipped, again.",
                "status": "published",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.mailer.recipients().len(), 1);

    let (_, listed) = send_json(&h.app, get("/api/content/en/posts?category=news")).await;
    assert_eq!(listed[0]["slug"], "launch-day");

    let actions = h.store.activity_actions();
    assert_eq!(
        actions,
        vec![
            ("admin_key".to_string(), "post.create".to_string()),
            ("admin_key".to_string(), "post.update".to_string()),
        ]
    );
}

#[tokio::test]
async fn drafts_do_not_notify_and_stay_hidden() {
    let h = harness();
    h.store.seed_subscriber("active@example.com", true);

    let (status, body) = send_json(
        &h.app,
        admin(
            Method::POST,
            "/api/posts",
            Some(json!({ "title": "Draft", "content": "wip" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["status"], "draft");
    assert!(h.mailer.recipients().is_empty());

    let (_, listed) = send_json(&h.app, get("/api/content/en/posts")).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (_, all) = send_json(&h.app, admin(Method::GET, "/api/posts", None)).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn create_post_reports_validation_errors() {
    let h = harness();

    let (status, body) = send_json(
        &h.app,
        admin(Method::POST, "/api/posts", Some(json!({ "content": "body" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing title or slug");

    let (status, body) = send_json(
        &h.app,
        admin(
            Method::POST,
            "/api/posts",
            Some(json!({ "title": "Hi", "content": "x", "locale": "de" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "unsupported locale `de`");

    let (status, body) = send_json(
        &h.app,
        admin(
            Method::POST,
            "/api/posts",
            Some(json!({ "title": "Hi", "content": "x", "tags": ["ghost"] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "unknown tag `ghost`");
}

#[tokio::test]
async fn update_and_delete_posts_by_id() {
    let h = harness();
    let id = h.store.seed_post("first", Locale::En, "First", 10);

    let (status, body) = send_json(
        &h.app,
        admin(
            Method::PUT,
            "/api/posts",
            Some(json!({ "id": id.to_string(), "title": "First, revised", "summary": "short" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["title"], "First, revised");
    assert_eq!(body["post"]["summary"], "short");

    let (status, body) = send_json(
        &h.app,
        admin(Method::PUT, "/api/posts", Some(json!({ "title": "x" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing post ID");

    let uri = format!("/api/posts?id={id}");
    let (status, body) = send_json(&h.app, admin(Method::DELETE, &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (status, body) = send_json(&h.app, admin(Method::DELETE, &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found");
}

#[tokio::test]
async fn taxonomy_upsert_creates_then_merges_translations() {
    let h = harness();

    let (status, created) = send_json(
        &h.app,
        admin(
            Method::POST,
            "/api/categories",
            Some(json!({
                "slug": "databases",
                "translations": [{ "locale": "en", "name": "Databases" }],
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["name"], "Databases");

    let (status, updated) = send_json(
        &h.app,
        admin(
            Method::POST,
            "/api/categories",
            Some(json!({
                "slug": "databases",
                "translations": [{ "locale": "fr", "name": "Bases de données" }],
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["translations"].as_array().unwrap().len(), 2);

    let (_, fr) = send_json(&h.app, get("/api/content/fr/categories/databases")).await;
    assert_eq!(fr["name"], "Bases de données");

    let (status, body) = send_json(
        &h.app,
        admin(Method::POST, "/api/tags", Some(json!({ "translations": [] }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing slug");
}

#[tokio::test]
async fn subscriber_count_tracks_active_subscribers() {
    let h = harness();
    h.store.seed_subscriber("a@example.com", true);
    h.store.seed_subscriber("b@example.com", true);
    h.store.seed_subscriber("c@example.com", false);

    let (status, body) =
        send_json(&h.app, admin(Method::GET, "/api/subscribers/count", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "count": 2 }));
}

#[tokio::test]
async fn robots_sitemap_and_health() {
    let h = harness();
    h.store.seed_post("hello", Locale::Zh, "Hello", 1);

    let (status, headers, body) = send(&h.app, get("/robots.txt")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let robots = String::from_utf8(body).unwrap();
    assert!(robots.contains("Sitemap: http://blog.test/sitemap.xml"));

    let (status, _, body) = send(&h.app, get("/sitemap.xml")).await;
    assert_eq!(status, StatusCode::OK);
    let xml = String::from_utf8(body).unwrap();
    assert!(xml.contains("<loc>http://blog.test/zh/posts/hello</loc>"));

    let (status, _, _) = send(&h.app, get("/_health/db")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

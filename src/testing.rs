//! In-memory backend for tests
//!
//! Implements every repository trait over a mutex-guarded state so services
//! and routes can be exercised without a network. Failures can be injected
//! to check degradation paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::backend::repositories::{
    ArticleRepository, AuthRepository, CategoryRepository, CommentRepository,
    EngagementRepository, LoginRequest, MediaRepository, PasswordChange, ProfileUpdate,
    RegisterRequest, StatsRepository, UploadedMedia, UserRepository,
};
use crate::backend::{BackendError, Repositories};
use crate::models::{
    test_article, test_user, Article, ArticleInput, ArticleStatus, AuthSession, AuthorSummary,
    Category, CategoryInput, Comment, CreateCommentInput, LikeState, ListParams, PagedResult, Role,
    SystemStats, User,
};

/// Injected failure
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Failure {
    Status(u16),
    Unavailable,
}

impl Failure {
    fn to_error(self) -> BackendError {
        match self {
            Failure::Status(status) => BackendError::status(status, ""),
            Failure::Unavailable => BackendError::Unavailable,
        }
    }
}

#[derive(Default)]
pub struct FakeState {
    pub users: HashMap<String, User>,
    pub passwords: HashMap<String, (String, String)>,
    pub tokens: HashMap<String, String>,
    pub articles: Vec<Article>,
    pub comments: Vec<Comment>,
    pub categories: Vec<Category>,
    pub likes: HashSet<(String, String)>,
    pub saved: HashSet<(String, String)>,
    pub stats: Option<SystemStats>,
    pub failure: Option<Failure>,
    pub calls: Vec<String>,
    next_id: u64,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }

    fn user_for(&self, token: &str) -> Result<User, BackendError> {
        self.tokens
            .get(token)
            .and_then(|id| self.users.get(id))
            .cloned()
            .ok_or_else(|| BackendError::status(401, "Invalid token"))
    }
}

/// In-memory backend implementing every repository trait
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Bundle this backend as every repository
    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            auth: self.clone(),
            articles: self.clone(),
            comments: self.clone(),
            categories: self.clone(),
            engagement: self.clone(),
            users: self.clone(),
            stats: self.clone(),
            media: self.clone(),
        }
    }

    /// Add a user with a password and return a session for them
    pub fn add_user(&self, id: &str, role: Role, password: &str) -> AuthSession {
        let user = test_user(id, role);
        let token = format!("token-{}", id);
        let mut state = self.state();
        state
            .passwords
            .insert(user.email.clone(), (password.to_string(), id.to_string()));
        state.tokens.insert(token.clone(), id.to_string());
        state.users.insert(id.to_string(), user.clone());
        AuthSession { token, user }
    }

    pub fn add_article(&self, article: Article) {
        self.state().articles.push(article);
    }

    /// Add a published article by `author_id` and return it
    pub fn add_published(&self, id: &str, slug: &str, author_id: &str) -> Article {
        let article = test_article(id, slug, author_id);
        self.add_article(article.clone());
        article
    }

    pub fn add_category(&self, id: &str, name: &str, slug: &str) -> Category {
        let category = Category {
            id: id.to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
            description: None,
            article_count: 0,
        };
        self.state().categories.push(category.clone());
        category
    }

    pub fn add_comment(&self, id: &str, article_id: &str, author_id: &str, parent: Option<&str>) {
        self.state().comments.push(Comment {
            id: id.to_string(),
            article_id: article_id.to_string(),
            author: Some(AuthorSummary {
                id: author_id.to_string(),
                name: format!("Author {}", author_id),
                avatar: None,
            }),
            content: format!("Comment {}", id),
            parent_id: parent.map(String::from),
            created_at: None,
        });
    }

    pub fn fail_with(&self, failure: Option<Failure>) {
        self.state().failure = failure;
    }

    /// How many times an operation was called
    pub fn calls(&self, name: &str) -> usize {
        self.state().calls.iter().filter(|c| *c == name).count()
    }

    fn enter(&self, name: &str) -> Result<MutexGuard<'_, FakeState>, BackendError> {
        let mut state = self.state();
        state.calls.push(name.to_string());
        match state.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(state),
        }
    }
}

fn paginate<T: Clone>(items: Vec<T>, page: u32, limit: u32) -> PagedResult<T> {
    let total = items.len() as u64;
    let start = ((page.max(1) - 1) * limit) as usize;
    let slice = items.into_iter().skip(start).take(limit as usize).collect();
    PagedResult::new(slice, total, page, limit)
}

fn author_of(user: &User) -> AuthorSummary {
    AuthorSummary {
        id: user.id.clone(),
        name: user.name.clone(),
        avatar: user.avatar.clone(),
    }
}

#[async_trait]
impl AuthRepository for FakeBackend {
    async fn login(&self, request: &LoginRequest) -> Result<AuthSession, BackendError> {
        let mut state = self.enter("login")?;
        let (password, id) = state
            .passwords
            .get(&request.email)
            .cloned()
            .ok_or_else(|| BackendError::status(401, "Invalid credentials"))?;
        if password != request.password {
            return Err(BackendError::status(401, "Invalid credentials"));
        }
        let token = state.next_id("token-");
        state.tokens.insert(token.clone(), id.clone());
        let user = state.users[&id].clone();
        Ok(AuthSession { token, user })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, BackendError> {
        let mut state = self.enter("register")?;
        if state.passwords.contains_key(&request.email) {
            return Err(BackendError::status(409, "Email already registered"));
        }
        let id = state.next_id("u");
        let mut user = test_user(&id, Role::User);
        user.name = request.name.clone();
        user.email = request.email.clone();
        let token = state.next_id("token-");
        state
            .passwords
            .insert(request.email.clone(), (request.password.clone(), id.clone()));
        state.tokens.insert(token.clone(), id.clone());
        state.users.insert(id, user.clone());
        Ok(AuthSession { token, user })
    }

    async fn logout(&self, token: &str) -> Result<(), BackendError> {
        let mut state = self.enter("logout")?;
        state.tokens.remove(token);
        Ok(())
    }

    async fn me(&self, token: &str) -> Result<User, BackendError> {
        self.enter("me")?.user_for(token)
    }

    async fn forgot_password(&self, email: &str) -> Result<(), BackendError> {
        let state = self.enter("forgot_password")?;
        if state.passwords.contains_key(email) {
            Ok(())
        } else {
            Err(BackendError::status(404, "No account with that email"))
        }
    }

    async fn reset_password(&self, reset_token: &str, _password: &str) -> Result<(), BackendError> {
        let _state = self.enter("reset_password")?;
        if reset_token == "valid-reset" {
            Ok(())
        } else {
            Err(BackendError::status(400, "Reset link is invalid or has expired"))
        }
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<User, BackendError> {
        let mut state = self.enter("update_profile")?;
        let user = state.user_for(token)?;
        let stored = state
            .users
            .get_mut(&user.id)
            .ok_or_else(|| BackendError::status(404, ""))?;
        stored.name = update.name.clone();
        stored.bio = update.bio.clone();
        stored.avatar = update.avatar.clone();
        Ok(stored.clone())
    }

    async fn change_password(&self, token: &str, change: &PasswordChange) -> Result<(), BackendError> {
        let mut state = self.enter("change_password")?;
        let user = state.user_for(token)?;
        let entry = state
            .passwords
            .get_mut(&user.email)
            .ok_or_else(|| BackendError::status(404, ""))?;
        if entry.0 != change.current_password {
            return Err(BackendError::status(400, "Current password is incorrect"));
        }
        entry.0 = change.new_password.clone();
        Ok(())
    }
}

#[async_trait]
impl ArticleRepository for FakeBackend {
    async fn list(
        &self,
        params: &ListParams,
        _token: Option<&str>,
    ) -> Result<PagedResult<Article>, BackendError> {
        let state = self.enter("articles.list")?;
        let items: Vec<Article> = state
            .articles
            .iter()
            .filter(|a| params.status.map_or(true, |s| a.status == s))
            .filter(|a| {
                params.category.as_deref().map_or(true, |c| {
                    a.category.as_ref().map_or(false, |cat| cat.slug == c)
                })
            })
            .filter(|a| {
                params.search.as_deref().map_or(true, |q| {
                    a.title.to_lowercase().contains(&q.to_lowercase())
                })
            })
            .filter(|a| {
                params
                    .author
                    .as_deref()
                    .map_or(true, |id| a.author_id() == Some(id))
            })
            .cloned()
            .collect();
        Ok(paginate(items, params.page, params.limit))
    }

    async fn get_by_slug(
        &self,
        slug: &str,
        _token: Option<&str>,
    ) -> Result<Option<Article>, BackendError> {
        let state = self.enter("articles.get_by_slug")?;
        Ok(state.articles.iter().find(|a| a.slug == slug).cloned())
    }

    async fn get_by_id(&self, id: &str, _token: Option<&str>) -> Result<Option<Article>, BackendError> {
        let state = self.enter("articles.get_by_id")?;
        Ok(state.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn list_mine(
        &self,
        token: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, BackendError> {
        let state = self.enter("articles.list_mine")?;
        let user = state.user_for(token)?;
        let items: Vec<Article> = state
            .articles
            .iter()
            .filter(|a| a.author_id() == Some(user.id.as_str()))
            .cloned()
            .collect();
        Ok(paginate(items, params.page, params.limit))
    }

    async fn create(&self, token: &str, input: &ArticleInput) -> Result<Article, BackendError> {
        let mut state = self.enter("articles.create")?;
        let user = state.user_for(token)?;
        let id = state.next_id("a");
        let category = state
            .categories
            .iter()
            .find(|c| c.id == input.category_id)
            .cloned();
        let article = Article {
            id: id.clone(),
            title: input.title.clone(),
            slug: format!("{}-{}", crate::services::validation::slugify(&input.title), id),
            excerpt: input.excerpt.clone(),
            content: input.content.clone(),
            cover_image: input.cover_image.clone(),
            category,
            author: Some(author_of(&user)),
            status: input.status,
            premium: input.premium,
            likes: 0,
            views: 0,
            comment_count: 0,
            published_at: None,
            created_at: None,
            updated_at: None,
        };
        state.articles.push(article.clone());
        Ok(article)
    }

    async fn update(
        &self,
        token: &str,
        id: &str,
        input: &ArticleInput,
    ) -> Result<Article, BackendError> {
        let mut state = self.enter("articles.update")?;
        state.user_for(token)?;
        let article = state
            .articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| BackendError::status(404, ""))?;
        article.title = input.title.clone();
        article.content = input.content.clone();
        article.excerpt = input.excerpt.clone();
        article.cover_image = input.cover_image.clone();
        article.status = input.status;
        article.premium = input.premium;
        Ok(article.clone())
    }

    async fn set_status(
        &self,
        token: &str,
        id: &str,
        status: ArticleStatus,
    ) -> Result<Article, BackendError> {
        let mut state = self.enter("articles.set_status")?;
        state.user_for(token)?;
        let article = state
            .articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| BackendError::status(404, ""))?;
        article.status = status;
        Ok(article.clone())
    }

    async fn delete(&self, token: &str, id: &str) -> Result<(), BackendError> {
        let mut state = self.enter("articles.delete")?;
        state.user_for(token)?;
        let before = state.articles.len();
        state.articles.retain(|a| a.id != id);
        if state.articles.len() == before {
            return Err(BackendError::status(404, ""));
        }
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for FakeBackend {
    async fn list_for_article(&self, article_id: &str) -> Result<Vec<Comment>, BackendError> {
        let state = self.enter("comments.list_for_article")?;
        Ok(state
            .comments
            .iter()
            .filter(|c| c.article_id == article_id)
            .cloned()
            .collect())
    }

    async fn create(&self, token: &str, input: &CreateCommentInput) -> Result<Comment, BackendError> {
        let mut state = self.enter("comments.create")?;
        let user = state.user_for(token)?;
        let id = state.next_id("c");
        let comment = Comment {
            id,
            article_id: input.article_id.clone(),
            author: Some(author_of(&user)),
            content: input.content.clone(),
            parent_id: input.parent_id.clone(),
            created_at: None,
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn delete(&self, token: &str, id: &str) -> Result<(), BackendError> {
        let mut state = self.enter("comments.delete")?;
        state.user_for(token)?;
        state.comments.retain(|c| c.id != id);
        Ok(())
    }

    async fn list_all(
        &self,
        token: &str,
        page: u32,
        limit: u32,
    ) -> Result<PagedResult<Comment>, BackendError> {
        let state = self.enter("comments.list_all")?;
        state.user_for(token)?;
        Ok(paginate(state.comments.clone(), page, limit))
    }
}

#[async_trait]
impl CategoryRepository for FakeBackend {
    async fn list(&self) -> Result<Vec<Category>, BackendError> {
        Ok(self.enter("categories.list")?.categories.clone())
    }

    async fn create(&self, token: &str, input: &CategoryInput) -> Result<Category, BackendError> {
        let mut state = self.enter("categories.create")?;
        state.user_for(token)?;
        if state.categories.iter().any(|c| c.slug == input.slug) {
            return Err(BackendError::status(409, ""));
        }
        let category = Category {
            id: state.next_id("cat"),
            name: input.name.clone(),
            slug: input.slug.clone(),
            description: input.description.clone(),
            article_count: 0,
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn update(
        &self,
        token: &str,
        id: &str,
        input: &CategoryInput,
    ) -> Result<Category, BackendError> {
        let mut state = self.enter("categories.update")?;
        state.user_for(token)?;
        let category = state
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| BackendError::status(404, ""))?;
        category.name = input.name.clone();
        category.slug = input.slug.clone();
        category.description = input.description.clone();
        Ok(category.clone())
    }

    async fn delete(&self, token: &str, id: &str) -> Result<(), BackendError> {
        let mut state = self.enter("categories.delete")?;
        state.user_for(token)?;
        state.categories.retain(|c| c.id != id);
        Ok(())
    }
}

#[async_trait]
impl EngagementRepository for FakeBackend {
    async fn toggle_like(&self, token: &str, article_id: &str) -> Result<LikeState, BackendError> {
        let mut state = self.enter("engagement.toggle_like")?;
        let user = state.user_for(token)?;
        let key = (user.id.clone(), article_id.to_string());
        let liked = if state.likes.remove(&key) {
            false
        } else {
            state.likes.insert(key);
            true
        };
        let likes = state.likes.iter().filter(|(_, a)| a == article_id).count() as u64;
        Ok(LikeState::new(liked, likes))
    }

    async fn like_status(&self, token: &str, article_id: &str) -> Result<LikeState, BackendError> {
        let state = self.enter("engagement.like_status")?;
        let user = state.user_for(token)?;
        let liked = state
            .likes
            .contains(&(user.id.clone(), article_id.to_string()));
        let likes = state.likes.iter().filter(|(_, a)| a == article_id).count() as u64;
        Ok(LikeState::new(liked, likes))
    }

    async fn saved(&self, token: &str) -> Result<Vec<Article>, BackendError> {
        let state = self.enter("engagement.saved")?;
        let user = state.user_for(token)?;
        Ok(state
            .articles
            .iter()
            .filter(|a| state.saved.contains(&(user.id.clone(), a.id.clone())))
            .cloned()
            .collect())
    }

    async fn save(&self, token: &str, article_id: &str) -> Result<(), BackendError> {
        let mut state = self.enter("engagement.save")?;
        let user = state.user_for(token)?;
        state.saved.insert((user.id, article_id.to_string()));
        Ok(())
    }

    async fn unsave(&self, token: &str, article_id: &str) -> Result<(), BackendError> {
        let mut state = self.enter("engagement.unsave")?;
        let user = state.user_for(token)?;
        state.saved.remove(&(user.id, article_id.to_string()));
        Ok(())
    }
}

#[async_trait]
impl UserRepository for FakeBackend {
    async fn list(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> Result<PagedResult<User>, BackendError> {
        let state = self.enter("users.list")?;
        state.user_for(token)?;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| search.map_or(true, |q| u.name.contains(q) || u.email.contains(q)))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(paginate(users, page, limit))
    }

    async fn get_by_id(&self, token: &str, id: &str) -> Result<Option<User>, BackendError> {
        let state = self.enter("users.get_by_id")?;
        state.user_for(token)?;
        Ok(state.users.get(id).cloned())
    }

    async fn set_role(&self, token: &str, id: &str, role: Role) -> Result<User, BackendError> {
        let mut state = self.enter("users.set_role")?;
        state.user_for(token)?;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| BackendError::status(404, ""))?;
        user.role = role;
        Ok(user.clone())
    }

    async fn set_active(&self, token: &str, id: &str, active: bool) -> Result<User, BackendError> {
        let mut state = self.enter("users.set_active")?;
        state.user_for(token)?;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| BackendError::status(404, ""))?;
        user.active = active;
        Ok(user.clone())
    }

    async fn delete(&self, token: &str, id: &str) -> Result<(), BackendError> {
        let mut state = self.enter("users.delete")?;
        state.user_for(token)?;
        state.users.remove(id);
        Ok(())
    }
}

#[async_trait]
impl StatsRepository for FakeBackend {
    async fn stats(&self, token: &str) -> Result<SystemStats, BackendError> {
        let state = self.enter("stats")?;
        state.user_for(token)?;
        Ok(state.stats.clone().unwrap_or_else(|| SystemStats {
            total_users: state.users.len() as u64,
            total_articles: state.articles.len() as u64,
            total_comments: state.comments.len() as u64,
            total_categories: state.categories.len() as u64,
            ..Default::default()
        }))
    }
}

#[async_trait]
impl MediaRepository for FakeBackend {
    async fn upload(
        &self,
        token: &str,
        filename: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<UploadedMedia, BackendError> {
        let state = self.enter("media.upload")?;
        state.user_for(token)?;
        Ok(UploadedMedia {
            url: format!("/uploads/{}", filename),
            filename: Some(filename.to_string()),
        })
    }
}

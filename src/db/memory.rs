//! In-memory row store used by the unit tests in place of Postgres.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
    auth::{repo::UserRepo, repo_types::User},
    posts::{
        repo::PostRepo,
        repo_types::{Comment, Like, Post, PostSorting, PostWithLikes},
    },
};

#[derive(Default)]
pub struct MemoryDb {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    likes: Vec<Like>,
}

impl Tables {
    fn with_likes(&self, post: &Post) -> PostWithLikes {
        let likes = self.likes.iter().filter(|l| l.post_id == post.id).count() as i64;
        PostWithLikes {
            id: post.id,
            user_id: post.user_id,
            body: post.body.clone(),
            image_url: post.image_url.clone(),
            likes,
        }
    }
}

#[async_trait]
impl UserRepo for MemoryDb {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.email == email) {
            return Ok(None);
        }
        let user = User {
            id: t.users.len() as i64 + 1,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            confirmed: false,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(Some(user))
    }

    async fn confirm_user(&self, email: &str) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().await;
        match t.users.iter_mut().find(|u| u.email == email) {
            Some(u) => {
                u.confirmed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl PostRepo for MemoryDb {
    async fn create_post(&self, user_id: i64, body: &str) -> anyhow::Result<Post> {
        let mut t = self.tables.lock().await;
        let post = Post {
            id: t.posts.len() as i64 + 1,
            user_id,
            body: body.to_string(),
            image_url: None,
        };
        t.posts.push(post.clone());
        Ok(post)
    }

    async fn find_post(&self, post_id: i64) -> anyhow::Result<Option<Post>> {
        let t = self.tables.lock().await;
        Ok(t.posts.iter().find(|p| p.id == post_id).cloned())
    }

    async fn find_post_with_likes(&self, post_id: i64) -> anyhow::Result<Option<PostWithLikes>> {
        let t = self.tables.lock().await;
        Ok(t.posts.iter().find(|p| p.id == post_id).map(|p| t.with_likes(p)))
    }

    async fn list_posts(&self, sorting: PostSorting) -> anyhow::Result<Vec<PostWithLikes>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<PostWithLikes> = t.posts.iter().map(|p| t.with_likes(p)).collect();
        match sorting {
            PostSorting::New => rows.sort_by(|a, b| b.id.cmp(&a.id)),
            PostSorting::Old => rows.sort_by(|a, b| a.id.cmp(&b.id)),
            PostSorting::MostLikes => {
                rows.sort_by(|a, b| b.likes.cmp(&a.likes).then(b.id.cmp(&a.id)))
            }
        }
        Ok(rows)
    }

    async fn set_post_image_url(&self, post_id: i64, image_url: &str) -> anyhow::Result<bool> {
        let mut t = self.tables.lock().await;
        match t.posts.iter_mut().find(|p| p.id == post_id) {
            Some(p) => {
                p.image_url = Some(image_url.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_comment(&self, post_id: i64, user_id: i64, body: &str) -> anyhow::Result<Comment> {
        let mut t = self.tables.lock().await;
        let comment = Comment {
            id: t.comments.len() as i64 + 1,
            post_id,
            user_id,
            body: body.to_string(),
        };
        t.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, post_id: i64) -> anyhow::Result<Vec<Comment>> {
        let t = self.tables.lock().await;
        Ok(t.comments.iter().filter(|c| c.post_id == post_id).cloned().collect())
    }

    async fn create_like(&self, post_id: i64, user_id: i64) -> anyhow::Result<Like> {
        let mut t = self.tables.lock().await;
        let like = Like {
            id: t.likes.len() as i64 + 1,
            post_id,
            user_id,
        };
        t.likes.push(like.clone());
        Ok(like)
    }
}

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{Comment, Like, Post, PostSorting, PostWithLikes};

#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create_post(&self, user_id: i64, body: &str) -> anyhow::Result<Post>;
    async fn find_post(&self, post_id: i64) -> anyhow::Result<Option<Post>>;
    async fn find_post_with_likes(&self, post_id: i64) -> anyhow::Result<Option<PostWithLikes>>;
    async fn list_posts(&self, sorting: PostSorting) -> anyhow::Result<Vec<PostWithLikes>>;

    /// Sets the image of exactly one post. `false` when the post is gone.
    async fn set_post_image_url(&self, post_id: i64, image_url: &str) -> anyhow::Result<bool>;

    async fn create_comment(&self, post_id: i64, user_id: i64, body: &str) -> anyhow::Result<Comment>;
    async fn list_comments(&self, post_id: i64) -> anyhow::Result<Vec<Comment>>;
    async fn create_like(&self, post_id: i64, user_id: i64) -> anyhow::Result<Like>;
}

const SELECT_POST_WITH_LIKES: &str = r#"
    SELECT p.id, p.user_id, p.body, p.image_url, COUNT(l.id) AS likes
      FROM posts p
      LEFT JOIN likes l ON l.post_id = p.id
"#;

#[async_trait]
impl PostRepo for PgPool {
    async fn create_post(&self, user_id: i64, body: &str) -> anyhow::Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (user_id, body)
            VALUES ($1, $2)
            RETURNING id, user_id, body, image_url
            "#,
        )
        .bind(user_id)
        .bind(body)
        .fetch_one(self)
        .await
        .context("insert post")?;
        Ok(post)
    }

    async fn find_post(&self, post_id: i64) -> anyhow::Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"SELECT id, user_id, body, image_url FROM posts WHERE id = $1"#,
        )
        .bind(post_id)
        .fetch_optional(self)
        .await
        .context("find post")?;
        Ok(post)
    }

    async fn find_post_with_likes(&self, post_id: i64) -> anyhow::Result<Option<PostWithLikes>> {
        let sql = format!("{SELECT_POST_WITH_LIKES} WHERE p.id = $1 GROUP BY p.id");
        let post = sqlx::query_as::<_, PostWithLikes>(&sql)
            .bind(post_id)
            .fetch_optional(self)
            .await
            .context("find post with likes")?;
        Ok(post)
    }

    async fn list_posts(&self, sorting: PostSorting) -> anyhow::Result<Vec<PostWithLikes>> {
        let order = match sorting {
            PostSorting::New => "p.id DESC",
            PostSorting::Old => "p.id ASC",
            PostSorting::MostLikes => "likes DESC, p.id DESC",
        };
        let sql = format!("{SELECT_POST_WITH_LIKES} GROUP BY p.id ORDER BY {order}");
        let rows = sqlx::query_as::<_, PostWithLikes>(&sql)
            .fetch_all(self)
            .await
            .context("list posts")?;
        Ok(rows)
    }

    async fn set_post_image_url(&self, post_id: i64, image_url: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"UPDATE posts SET image_url = $1 WHERE id = $2"#)
            .bind(image_url)
            .bind(post_id)
            .execute(self)
            .await
            .context("update post image_url")?;
        Ok(res.rows_affected() > 0)
    }

    async fn create_comment(&self, post_id: i64, user_id: i64, body: &str) -> anyhow::Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, user_id, body)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, user_id, body
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(body)
        .fetch_one(self)
        .await
        .context("insert comment")?;
        Ok(comment)
    }

    async fn list_comments(&self, post_id: i64) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, user_id, body
              FROM comments
             WHERE post_id = $1
             ORDER BY id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(self)
        .await
        .context("list comments by post")?;
        Ok(rows)
    }

    async fn create_like(&self, post_id: i64, user_id: i64) -> anyhow::Result<Like> {
        let like = sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (post_id, user_id)
            VALUES ($1, $2)
            RETURNING id, post_id, user_id
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(self)
        .await
        .context("insert like")?;
        Ok(like)
    }
}

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use crate::{api_client::ApiClient, db::Db, logging::obfuscate_email, posts::repo::PostRepo};

/// Work handed to the runner after a response has been built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    RegistrationEmail {
        email: String,
        confirmation_url: String,
    },
    GeneratePostImage {
        email: String,
        post_id: i64,
        post_url: String,
        prompt: String,
    },
}

/// What a job may touch: the row store and the outbound providers.
#[derive(Clone)]
pub struct JobContext {
    pub db: Arc<dyn Db>,
    pub api: ApiClient,
    pub log_email_chars: usize,
}

impl JobContext {
    fn masked(&self, email: &str) -> String {
        obfuscate_email(email, self.log_email_chars)
    }
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::RegistrationEmail { .. } => "registration_email",
            Job::GeneratePostImage { .. } => "generate_post_image",
        }
    }

    pub async fn run(self, ctx: &JobContext) -> anyhow::Result<()> {
        match self {
            Job::RegistrationEmail {
                email,
                confirmation_url,
            } => send_registration_email(ctx, &email, &confirmation_url).await,
            Job::GeneratePostImage {
                email,
                post_id,
                post_url,
                prompt,
            } => generate_and_attach_image(ctx, &email, post_id, &post_url, &prompt)
                .await
                .map(|_| ()),
        }
    }
}

pub async fn send_registration_email(
    ctx: &JobContext,
    email: &str,
    confirmation_url: &str,
) -> anyhow::Result<()> {
    info!(email = %ctx.masked(email), "sending registration email");
    ctx.api
        .send_email(
            email,
            "Successfully signed up",
            &format!(
                "Hi {email}! You have successfully signed up to Postboard. \
                 Please confirm your email by clicking on the following link: {confirmation_url}"
            ),
        )
        .await
        .context("send registration email")?;
    Ok(())
}

/// Generates an image for `prompt` and stores its URL on the post.
/// The post row is only written once the provider returned a usable URL.
pub async fn generate_and_attach_image(
    ctx: &JobContext,
    email: &str,
    post_id: i64,
    post_url: &str,
    prompt: &str,
) -> anyhow::Result<String> {
    info!(post_id, "generating image for post");

    let image = match ctx.api.generate_image(prompt).await {
        Ok(image) => image,
        Err(e) => {
            error!(error = %e, post_id, "image generation failed");
            if let Err(mail_err) = ctx
                .api
                .send_email(
                    email,
                    "Error generating image",
                    &format!(
                        "Hi {email}! Unfortunately there was an error generating an image \
                         for your post."
                    ),
                )
                .await
            {
                warn!(error = %mail_err, email = %ctx.masked(email), "failure notice not sent");
            }
            return Err(e).context("generate image");
        }
    };

    let updated = ctx
        .db
        .set_post_image_url(post_id, &image.output_url)
        .await?;
    if !updated {
        anyhow::bail!("post {post_id} no longer exists");
    }
    info!(post_id, image_url = %image.output_url, "post image attached");

    ctx.api
        .send_email(
            email,
            "Image generation completed",
            &format!(
                "Hi {email}! Your image has been generated and added to your post. \
                 Please click on the following link to view it: {post_url}"
            ),
        )
        .await
        .context("send image completion email")?;

    Ok(image.output_url)
}

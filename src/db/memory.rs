// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store used for local runs and the test suite.
//!
//! Mirrors the Firestore layout: one map per collection plus claim maps
//! that reserve usernames and emails.

use dashmap::{mapref::entry::Entry, DashMap};

use crate::error::AppError;
use crate::models::{Subscription, User, Video};

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    usernames: DashMap<String, String>,
    emails: DashMap<String, String>,
    subscriptions: DashMap<String, Subscription>,
    videos: DashMap<String, Video>,
}

impl MemoryStore {
    pub fn get_user(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|u| u.clone())
    }

    pub fn get_user_by_username(&self, username: &str) -> Option<User> {
        let id = self.usernames.get(username)?.clone();
        self.get_user(&id)
    }

    pub fn find_user_by_identity(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Option<User> {
        self.users
            .iter()
            .find(|u| username == Some(u.username.as_str()) || email == Some(u.email.as_str()))
            .map(|u| u.clone())
    }

    pub fn create_user(&self, user: &User) -> Result<(), AppError> {
        claim(&self.usernames, &user.username, &user.id)?;
        if let Err(e) = claim(&self.emails, &user.email, &user.id) {
            self.usernames.remove(&user.username);
            return Err(e);
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    pub fn update_refresh_token(&self, id: &str, token: Option<&str>) {
        if let Some(mut user) = self.users.get_mut(id) {
            user.refresh_token = token.map(str::to_string);
        }
    }

    pub fn update_password(&self, id: &str, password_hash: &str, now: &str) {
        if let Some(mut user) = self.users.get_mut(id) {
            user.password_hash = password_hash.to_string();
            user.updated_at = now.to_string();
        }
    }

    pub fn update_account_details(
        &self,
        current: &User,
        full_name: &str,
        email: &str,
        now: &str,
    ) -> Result<(), AppError> {
        if email != current.email {
            claim(&self.emails, email, &current.id)?;
            self.emails.remove(&current.email);
        }
        if let Some(mut user) = self.users.get_mut(&current.id) {
            user.full_name = full_name.to_string();
            user.email = email.to_string();
            user.updated_at = now.to_string();
        }
        Ok(())
    }

    pub fn update_avatar(&self, id: &str, url: &str, now: &str) {
        if let Some(mut user) = self.users.get_mut(id) {
            user.avatar = url.to_string();
            user.updated_at = now.to_string();
        }
    }

    pub fn update_cover_image(&self, id: &str, url: &str, now: &str) {
        if let Some(mut user) = self.users.get_mut(id) {
            user.cover_image = Some(url.to_string());
            user.updated_at = now.to_string();
        }
    }

    pub fn push_watch_history(&self, id: &str, video_id: &str) {
        if let Some(mut user) = self.users.get_mut(id) {
            user.watch_history.push(video_id.to_string());
        }
    }

    pub fn put_subscription(&self, subscription: &Subscription) {
        self.subscriptions
            .insert(subscription.doc_id(), subscription.clone());
    }

    pub fn count_subscribers(&self, channel_id: &str) -> u64 {
        self.subscriptions
            .iter()
            .filter(|s| s.channel == channel_id)
            .count() as u64
    }

    pub fn count_subscriptions(&self, subscriber_id: &str) -> u64 {
        self.subscriptions
            .iter()
            .filter(|s| s.subscriber == subscriber_id)
            .count() as u64
    }

    pub fn is_subscribed(&self, subscriber_id: &str, channel_id: &str) -> bool {
        self.subscriptions
            .contains_key(&format!("{}_{}", subscriber_id, channel_id))
    }

    pub fn put_video(&self, video: &Video) {
        self.videos.insert(video.id.clone(), video.clone());
    }

    pub fn get_video(&self, id: &str) -> Option<Video> {
        self.videos.get(id).map(|v| v.clone())
    }
}

/// Reserve `key` for `user_id`, failing if another user holds it.
fn claim(map: &DashMap<String, String>, key: &str, user_id: &str) -> Result<(), AppError> {
    match map.entry(key.to_string()) {
        Entry::Occupied(existing) if existing.get() != user_id => Err(AppError::Conflict(
            "User with email or username already exists".to_string(),
        )),
        Entry::Occupied(_) => Ok(()),
        Entry::Vacant(slot) => {
            slot.insert(user_id.to_string());
            Ok(())
        }
    }
}

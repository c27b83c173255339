use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::repository::CommunityRepository;
use crate::models::community::{CommunityResponse, CreateCommunityRequest, MemberResponse};
use crate::models::Community;
use crate::pagination::{OffsetPage, OffsetParams};
use crate::utils::validation::{validate_community_name, validate_text, COMMUNITY_DESCRIPTION_MAX};
use crate::{AppError, Result};

pub struct CommunityService {
    community_repo: Arc<dyn CommunityRepository>,
}

impl CommunityService {
    pub fn new(community_repo: Arc<dyn CommunityRepository>) -> Self {
        Self { community_repo }
    }

    /// Create a community; the creator becomes its first member
    pub async fn create_community(&self, creator_id: Uuid, request: CreateCommunityRequest) -> Result<CommunityResponse> {
        let name = validate_community_name(&request.name)?;
        let description = validate_text("Description", &request.description, 0, COMMUNITY_DESCRIPTION_MAX)?;

        let community = Community {
            id: Uuid::new_v4(),
            name,
            description,
            creator_id,
            member_count: 1,
            created_at: Utc::now(),
            deleted_at: None,
        };

        let created = self.community_repo.create_community(&community).await?;
        tracing::info!("🏘️ COMMUNITY: Created c/{} by {}", created.name, creator_id);

        let mut response = CommunityResponse::from(created);
        response.is_member = Some(true);
        Ok(response)
    }

    /// Resolve a live community by name (case-insensitive)
    pub async fn find_by_name(&self, name: &str) -> Result<Community> {
        self.community_repo
            .get_community_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Community '{}' not found", name)))
    }

    pub async fn get_community(&self, name: &str, viewer: Option<Uuid>) -> Result<CommunityResponse> {
        let community = self.find_by_name(name).await?;
        let is_member = match viewer {
            Some(user_id) => Some(self.community_repo.is_member(community.id, user_id).await?),
            None => None,
        };

        let mut response = CommunityResponse::from(community);
        response.is_member = is_member;
        Ok(response)
    }

    pub async fn list_communities(&self, params: OffsetParams) -> Result<OffsetPage<CommunityResponse>> {
        params.validate()?;
        let (rows, total) = self.community_repo.list_communities(&params).await?;
        let items = rows.into_iter().map(CommunityResponse::from).collect();
        Ok(OffsetPage::new(items, total, &params))
    }

    pub async fn join(&self, name: &str, user_id: Uuid) -> Result<CommunityResponse> {
        let community = self.find_by_name(name).await?;
        let updated = self.community_repo.add_member(community.id, user_id).await?;
        tracing::info!("➕ COMMUNITY: {} joined c/{} ({} members)", user_id, updated.name, updated.member_count);

        let mut response = CommunityResponse::from(updated);
        response.is_member = Some(true);
        Ok(response)
    }

    pub async fn leave(&self, name: &str, user_id: Uuid) -> Result<CommunityResponse> {
        let community = self.find_by_name(name).await?;
        let updated = self.community_repo.remove_member(community.id, user_id).await?;
        tracing::info!("➖ COMMUNITY: {} left c/{} ({} members)", user_id, updated.name, updated.member_count);

        let mut response = CommunityResponse::from(updated);
        response.is_member = Some(false);
        Ok(response)
    }

    pub async fn list_members(&self, name: &str, params: OffsetParams) -> Result<OffsetPage<MemberResponse>> {
        params.validate()?;
        let community = self.find_by_name(name).await?;
        let (rows, total) = self.community_repo.list_members(community.id, &params).await?;
        Ok(OffsetPage::new(rows, total, &params))
    }

    pub async fn is_member(&self, community_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.community_repo.is_member(community_id, user_id).await
    }
}

use async_trait::async_trait;
use storage::gateway::{EffortProvider, ProviderError};
use storage::models::{ChallengeWindow, EffortSummary};

use crate::client::StravaClient;

#[async_trait]
impl EffortProvider for StravaClient {
    async fn segment_efforts(
        &self,
        access_token: &str,
        segment_id: i64,
        athlete_id: i64,
        window: &ChallengeWindow,
    ) -> Result<Vec<EffortSummary>, ProviderError> {
        let efforts = StravaClient::segment_efforts(self, access_token, segment_id, athlete_id, window)
            .await?;

        Ok(efforts.iter().map(EffortSummary::from).collect())
    }
}

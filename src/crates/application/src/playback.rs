use crate::error::AppError;
use async_trait::async_trait;
use domain::track::Track;
use domain::value::TrackId;
use std::sync::Arc;

/// 音频输出设备
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn load(&self, url: &str) -> Result<(), AppError>;
    async fn play(&self) -> Result<(), AppError>;
    async fn pause(&self) -> Result<(), AppError>;
    async fn seek(&self, seconds: f64) -> Result<(), AppError>;
    async fn stop(&self) -> Result<(), AppError>;
}

/// 音频设备回报的事件
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    CanPlay,
    TimeUpdate(f64),
    Ended,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackState {
    Stopped,
    Loading(TrackId),
    Playing(TrackId),
    Paused(TrackId),
    Failed { track_id: TrackId, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub track_id: TrackId,
    pub file_url: String,
}

impl From<&Track> for QueueItem {
    fn from(track: &Track) -> Self {
        Self {
            track_id: track.id.clone(),
            file_url: track.file_url.clone(),
        }
    }
}

/// 播放控制：维护播放队列，响应设备事件
pub struct PlaybackController {
    output: Arc<dyn AudioOutput>,
    queue: Vec<QueueItem>,
    current: Option<usize>,
    state: PlaybackState,
    position: f64,
    auto_advance: bool,
}

impl PlaybackController {
    pub fn new(output: Arc<dyn AudioOutput>, auto_advance: bool) -> Self {
        Self {
            output,
            queue: Vec::new(),
            current: None,
            state: PlaybackState::Stopped,
            position: 0.0,
            auto_advance,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn queue(&self) -> &[QueueItem] {
        &self.queue
    }

    pub fn current_track(&self) -> Option<&TrackId> {
        self.current
            .and_then(|i| self.queue.get(i))
            .map(|item| &item.track_id)
    }

    /// 替换队列；当前曲目仍在新队列中时保留其位置
    pub fn set_queue(&mut self, queue: Vec<QueueItem>) {
        let current = self.current_track().cloned();
        self.current = current.and_then(|id| queue.iter().position(|item| item.track_id == id));
        self.queue = queue;
    }

    pub async fn play_track(&mut self, track_id: &TrackId) -> Result<(), AppError> {
        let index = self
            .queue
            .iter()
            .position(|item| &item.track_id == track_id)
            .ok_or_else(|| {
                AppError::InvalidInput(format!("Track {} is not in the play queue", track_id))
            })?;
        self.start(index).await
    }

    /// 点击同一首在播放/暂停之间切换，点击其他曲目则切歌
    pub async fn toggle(&mut self, track_id: &TrackId) -> Result<(), AppError> {
        if self.current_track() == Some(track_id) {
            match self.state {
                PlaybackState::Playing(_) => return self.pause().await,
                PlaybackState::Paused(_) => return self.resume().await,
                PlaybackState::Loading(_) => return Ok(()),
                _ => {}
            }
        }
        self.play_track(track_id).await
    }

    pub async fn pause(&mut self) -> Result<(), AppError> {
        if let PlaybackState::Playing(id) = &self.state {
            let id = id.clone();
            self.output.pause().await?;
            self.state = PlaybackState::Paused(id);
        }
        Ok(())
    }

    pub async fn resume(&mut self) -> Result<(), AppError> {
        if let PlaybackState::Paused(id) = &self.state {
            let id = id.clone();
            self.output.play().await?;
            self.state = PlaybackState::Playing(id);
        }
        Ok(())
    }

    pub async fn seek(&mut self, seconds: f64) -> Result<(), AppError> {
        if self.current.is_none() {
            return Err(AppError::InvalidState("Nothing is playing".to_string()));
        }
        let seconds = seconds.max(0.0);
        self.output.seek(seconds).await?;
        self.position = seconds;
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), AppError> {
        if self.state != PlaybackState::Stopped {
            self.output.stop().await?;
        }
        self.state = PlaybackState::Stopped;
        self.current = None;
        self.position = 0.0;
        Ok(())
    }

    pub async fn next(&mut self) -> Result<Option<TrackId>, AppError> {
        let next = self.current.map_or(0, |i| i + 1);
        if next >= self.queue.len() {
            return Ok(None);
        }
        self.start(next).await?;
        Ok(self.current_track().cloned())
    }

    pub async fn previous(&mut self) -> Result<Option<TrackId>, AppError> {
        match self.current {
            Some(i) if i > 0 => {
                self.start(i - 1).await?;
                Ok(self.current_track().cloned())
            }
            _ => Ok(None),
        }
    }

    /// 处理设备事件；`Error` 事件以 `PlaybackError` 返回
    pub async fn handle_event(&mut self, event: AudioEvent) -> Result<(), AppError> {
        match event {
            AudioEvent::CanPlay => {
                if let PlaybackState::Loading(id) = &self.state {
                    let id = id.clone();
                    self.output.play().await?;
                    log::debug!("[Playback] playing track {}", id);
                    self.state = PlaybackState::Playing(id);
                }
                Ok(())
            }
            AudioEvent::TimeUpdate(seconds) => {
                self.position = seconds;
                Ok(())
            }
            AudioEvent::Ended => {
                let has_next = self.current.is_some_and(|i| i + 1 < self.queue.len());
                if self.auto_advance && has_next {
                    self.next().await?;
                } else {
                    self.state = PlaybackState::Stopped;
                    self.position = 0.0;
                }
                Ok(())
            }
            AudioEvent::Error(message) => {
                let track_id = self.current_track().cloned();
                log::error!("[Playback] audio error on {:?}: {}", track_id, message);
                if let Some(track_id) = track_id {
                    self.state = PlaybackState::Failed {
                        track_id,
                        message: message.clone(),
                    };
                }
                Err(AppError::PlaybackError(message))
            }
        }
    }

    async fn start(&mut self, index: usize) -> Result<(), AppError> {
        let item = self
            .queue
            .get(index)
            .cloned()
            .ok_or_else(|| AppError::InvalidInput(format!("Queue index {} out of range", index)))?;
        if self.state != PlaybackState::Stopped {
            self.output.stop().await?;
        }
        self.current = Some(index);
        self.position = 0.0;
        self.output.load(&item.file_url).await?;
        log::debug!("[Playback] loading track {}", item.track_id);
        self.state = PlaybackState::Loading(item.track_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingOutput {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingOutput {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl AudioOutput for RecordingOutput {
        async fn load(&self, url: &str) -> Result<(), AppError> {
            self.record(format!("load {}", url));
            Ok(())
        }
        async fn play(&self) -> Result<(), AppError> {
            self.record("play".to_string());
            Ok(())
        }
        async fn pause(&self) -> Result<(), AppError> {
            self.record("pause".to_string());
            Ok(())
        }
        async fn seek(&self, seconds: f64) -> Result<(), AppError> {
            self.record(format!("seek {}", seconds));
            Ok(())
        }
        async fn stop(&self) -> Result<(), AppError> {
            self.record("stop".to_string());
            Ok(())
        }
    }

    fn queue() -> Vec<QueueItem> {
        (1..=3)
            .map(|i| QueueItem {
                track_id: TrackId::from(i),
                file_url: format!("tracks/{}.mp3", i),
            })
            .collect()
    }

    fn controller(auto_advance: bool) -> (PlaybackController, Arc<RecordingOutput>) {
        let output = Arc::new(RecordingOutput::default());
        let mut controller = PlaybackController::new(output.clone(), auto_advance);
        controller.set_queue(queue());
        (controller, output)
    }

    #[tokio::test]
    async fn test_play_waits_for_can_play() {
        let (mut player, output) = controller(true);
        player.play_track(&TrackId::from(2)).await.unwrap();
        assert_eq!(player.state(), &PlaybackState::Loading(TrackId::from(2)));
        player.handle_event(AudioEvent::CanPlay).await.unwrap();
        assert_eq!(player.state(), &PlaybackState::Playing(TrackId::from(2)));
        assert_eq!(output.calls(), vec!["load tracks/2.mp3", "play"]);
    }

    #[tokio::test]
    async fn test_ended_advances_to_next() {
        let (mut player, _) = controller(true);
        player.play_track(&TrackId::from(1)).await.unwrap();
        player.handle_event(AudioEvent::CanPlay).await.unwrap();
        player.handle_event(AudioEvent::Ended).await.unwrap();
        assert_eq!(player.state(), &PlaybackState::Loading(TrackId::from(2)));
    }

    #[tokio::test]
    async fn test_ended_on_last_track_stops() {
        let (mut player, _) = controller(true);
        player.play_track(&TrackId::from(3)).await.unwrap();
        player.handle_event(AudioEvent::CanPlay).await.unwrap();
        player.handle_event(AudioEvent::Ended).await.unwrap();
        assert_eq!(player.state(), &PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn test_ended_without_auto_advance_stops() {
        let (mut player, _) = controller(false);
        player.play_track(&TrackId::from(1)).await.unwrap();
        player.handle_event(AudioEvent::Ended).await.unwrap();
        assert_eq!(player.state(), &PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn test_toggle_pauses_and_resumes() {
        let (mut player, _) = controller(true);
        player.play_track(&TrackId::from(1)).await.unwrap();
        player.handle_event(AudioEvent::CanPlay).await.unwrap();
        player.toggle(&TrackId::from(1)).await.unwrap();
        assert_eq!(player.state(), &PlaybackState::Paused(TrackId::from(1)));
        player.toggle(&TrackId::from(1)).await.unwrap();
        assert_eq!(player.state(), &PlaybackState::Playing(TrackId::from(1)));
    }

    #[tokio::test]
    async fn test_error_event_marks_failed() {
        let (mut player, _) = controller(true);
        player.play_track(&TrackId::from(1)).await.unwrap();
        let result = player.handle_event(AudioEvent::Error("decode".to_string())).await;
        assert!(matches!(result, Err(AppError::PlaybackError(_))));
        assert!(matches!(player.state(), PlaybackState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_unknown_track_rejected() {
        let (mut player, _) = controller(true);
        assert!(player.play_track(&TrackId::from(9)).await.is_err());
        assert_eq!(player.state(), &PlaybackState::Stopped);
    }
}

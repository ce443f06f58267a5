//! セッション実行ループ
//!
//! 1つのタスクが `SessionOrchestrator` を所有し、入力イベントと
//! ゲートウェイ応答を順番に適用する。画像の取得とAPI呼び出しは別タスクで
//! 実行し、結果は世代番号付きでこのループへ戻す（ループ内では待たない）。
//! 表示側には `watch` チャネルでスナップショットを配信する

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{FinderError, Result};
use crate::gateway::{with_timeout, OutfitGateway, SimilarItemsOutcome};
use crate::input::{FileUpload, InputSources};
use fashion_finder_common::{
    AnalysisError, AnalysisTicket, Generation, ImagePayload, InputError, InputMode,
    OutfitAnalysisResult, SearchError, SearchTicket, SessionOrchestrator, SessionSnapshot,
    SourceSwitch,
};

/// 入力・表示側から届くイベント
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// 取得済みの画像を投入
    ImageCaptured(ImagePayload),
    /// ファイルを選択（アップロード入力で読み込む）
    FileSelected(PathBuf),
    /// Webカメラで撮影
    CaptureRequested,
    ImageSelectionFailed(InputError),
    /// 画像を消して同じ入力方法のまま続ける
    ClearRequested,
    InputModeChanged(InputMode),
    DismissError,
    /// 「やり直し / 入力切替」
    StartOver,
    Reset { preserve_input_mode: bool },
}

/// 画像の取得元
#[derive(Debug, Clone)]
enum ImageSource {
    File(PathBuf),
    Camera,
}

/// 別タスクからの応答
#[derive(Debug)]
enum Completion {
    Acquired {
        generation: Generation,
        source: ImageSource,
        result: std::result::Result<ImagePayload, InputError>,
    },
    Analysis {
        generation: Generation,
        result: std::result::Result<OutfitAnalysisResult, AnalysisError>,
    },
    Search {
        generation: Generation,
        result: std::result::Result<SimilarItemsOutcome, SearchError>,
    },
}

/// 配信される状態
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    /// 処理済みイベント数
    pub events_processed: u64,
    /// 画像の読み込み・撮影が進行中
    pub acquiring: bool,
    pub snapshot: SessionSnapshot,
}

/// セッションへの送信口（複製可）
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    updates: watch::Receiver<SessionUpdate>,
    sent: Arc<AtomicU64>,
}

impl SessionHandle {
    pub fn send(&self, event: SessionEvent) -> Result<()> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        self.events
            .send(event)
            .map_err(|_| FinderError::SessionClosed)
    }

    pub fn submit_image(&self, image: ImagePayload) -> Result<()> {
        self.send(SessionEvent::ImageCaptured(image))
    }

    pub fn select_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.send(SessionEvent::FileSelected(path.into()))
    }

    pub fn capture(&self) -> Result<()> {
        self.send(SessionEvent::CaptureRequested)
    }

    pub fn report_input_error(&self, error: InputError) -> Result<()> {
        self.send(SessionEvent::ImageSelectionFailed(error))
    }

    pub fn clear(&self) -> Result<()> {
        self.send(SessionEvent::ClearRequested)
    }

    pub fn set_input_mode(&self, mode: InputMode) -> Result<()> {
        self.send(SessionEvent::InputModeChanged(mode))
    }

    pub fn dismiss_error(&self) -> Result<()> {
        self.send(SessionEvent::DismissError)
    }

    pub fn start_over(&self) -> Result<()> {
        self.send(SessionEvent::StartOver)
    }

    pub fn reset(&self, preserve_input_mode: bool) -> Result<()> {
        self.send(SessionEvent::Reset { preserve_input_mode })
    }

    /// 現在のスナップショット
    pub fn snapshot(&self) -> SessionSnapshot {
        self.updates.borrow().snapshot.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionUpdate> {
        self.updates.clone()
    }

    /// 送信済みイベントをすべて処理し、取得・解析・検索がすべて終わるまで待つ
    pub async fn settled(&self) -> Result<SessionSnapshot> {
        let target = self.sent.load(Ordering::SeqCst);
        let mut updates = self.updates.clone();
        let update = updates
            .wait_for(|u| u.events_processed >= target && !u.acquiring && !u.snapshot.is_busy())
            .await
            .map_err(|_| FinderError::SessionClosed)?;
        Ok(update.snapshot.clone())
    }
}

/// セッションを起動する
///
/// 全ての `SessionHandle` が破棄されるとループは終了する
pub fn spawn_session<G>(
    gateway: Arc<G>,
    sources: InputSources,
    timeout: Duration,
) -> (SessionHandle, JoinHandle<()>)
where
    G: OutfitGateway + 'static,
{
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (completions_tx, completions_rx) = mpsc::unbounded_channel();
    let (updates_tx, updates_rx) = watch::channel(SessionUpdate::default());

    let runner = SessionRunner {
        orchestrator: SessionOrchestrator::new(),
        gateway,
        sources,
        timeout,
        events: events_rx,
        completions: completions_rx,
        completions_tx,
        updates: updates_tx,
        events_processed: 0,
        pending_acquisitions: 0,
    };
    let task = tokio::spawn(runner.run());

    let handle = SessionHandle {
        events: events_tx,
        updates: updates_rx,
        sent: Arc::new(AtomicU64::new(0)),
    };
    (handle, task)
}

struct SessionRunner<G> {
    orchestrator: SessionOrchestrator,
    gateway: Arc<G>,
    sources: InputSources,
    timeout: Duration,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    completions: mpsc::UnboundedReceiver<Completion>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    updates: watch::Sender<SessionUpdate>,
    events_processed: u64,
    pending_acquisitions: usize,
}

impl<G> SessionRunner<G>
where
    G: OutfitGateway + 'static,
{
    async fn run(mut self) {
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => {
                        self.handle_event(event);
                        self.events_processed += 1;
                    }
                    None => break,
                },
                Some(completion) = self.completions.recv() => self.handle_completion(completion),
            }
            self.publish();
        }

        // 終了時は撮影ファイル等を解放
        self.sources.clear_all();
        tracing::debug!("セッション終了");
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ImageCaptured(image) => self.submit(image),
            SessionEvent::FileSelected(path) => self.spawn_acquisition(ImageSource::File(path)),
            SessionEvent::CaptureRequested => self.spawn_acquisition(ImageSource::Camera),
            SessionEvent::ImageSelectionFailed(e) => self.input_error(e),
            SessionEvent::ClearRequested => self.reset(true),
            SessionEvent::Reset { preserve_input_mode } => self.reset(preserve_input_mode),
            SessionEvent::InputModeChanged(mode) => self.orchestrator.set_input_mode(mode),
            SessionEvent::DismissError => self.orchestrator.dismiss_error(),
            SessionEvent::StartOver => match self.orchestrator.switch_input_or_start_over() {
                SourceSwitch::StartedOver { discarded_image } => {
                    if discarded_image {
                        self.sources.clear_all();
                    }
                }
                SourceSwitch::Switched(mode) => tracing::debug!("入力方法を切替: {}", mode.as_str()),
                SourceSwitch::Ignored => tracing::debug!("読み込み中のためやり直しを無視"),
            },
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Acquired { generation, source, result } => {
                self.pending_acquisitions = self.pending_acquisitions.saturating_sub(1);
                if !self.orchestrator.is_current(generation) {
                    tracing::debug!("古い画像取得結果を破棄: {}", generation);
                    return;
                }
                match result {
                    Ok(image) => {
                        if let ImageSource::File(path) = source {
                            self.sources.upload.set_selected(path);
                        }
                        self.submit(image);
                    }
                    Err(e) => self.input_error(e),
                }
            }
            Completion::Analysis { generation, result } => {
                if !self.orchestrator.is_current(generation) {
                    tracing::debug!("古い解析応答を破棄: {}", generation);
                    return;
                }
                match result {
                    Ok(analysis) => {
                        tracing::info!(
                            "Step1完了 {}: {}件",
                            generation,
                            analysis.identified_clothing.len()
                        );
                        if let Some(ticket) = self.orchestrator.on_analysis_success(generation, analysis) {
                            self.spawn_search(ticket);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Step1失敗 {}: {}", generation, e);
                        self.orchestrator.on_analysis_failure(generation, e);
                    }
                }
            }
            Completion::Search { generation, result } => {
                if !self.orchestrator.is_current(generation) {
                    tracing::debug!("古い検索応答を破棄: {}", generation);
                    return;
                }
                match result {
                    Ok(outcome) => {
                        tracing::info!(
                            "Step2完了 {}: {}グループ, 出典{}件",
                            generation,
                            outcome.result.similar_items_suggestions.len(),
                            outcome.grounding_sources.len()
                        );
                        self.orchestrator.on_search_success(
                            generation,
                            outcome.result,
                            outcome.grounding_sources,
                        );
                    }
                    Err(e) => {
                        tracing::warn!("Step2失敗 {}: {}", generation, e);
                        self.orchestrator.on_search_failure(generation, e);
                    }
                }
            }
        }
    }

    fn submit(&mut self, image: ImagePayload) {
        let ticket = self.orchestrator.submit_image(image);
        tracing::debug!("Step1開始 {}", ticket.generation);
        self.spawn_analysis(ticket);
    }

    fn input_error(&mut self, error: InputError) {
        tracing::warn!("入力エラー: {}", error);
        if self.orchestrator.report_input_error(error) {
            self.sources.clear_all();
        }
    }

    fn reset(&mut self, preserve_input_mode: bool) {
        if self.orchestrator.reset(preserve_input_mode) {
            self.sources.clear_all();
        }
    }

    /// ファイル読み込み・撮影を別タスクで実行
    ///
    /// 撮影はゲートウェイと同じ上限時間で打ち切る
    fn spawn_acquisition(&mut self, source: ImageSource) {
        self.pending_acquisitions += 1;
        let generation = self.orchestrator.generation();
        let webcam = self.sources.webcam.clone();
        let tx = self.completions_tx.clone();
        let timeout = self.timeout;
        tracing::debug!("画像取得開始 {}: {:?}", generation, source);

        tokio::spawn(async move {
            let result = match &source {
                ImageSource::File(path) => FileUpload::load(path).await,
                ImageSource::Camera => with_timeout(timeout, webcam.capture()).await,
            };
            let _ = tx.send(Completion::Acquired {
                generation,
                source,
                result,
            });
        });
    }

    fn spawn_analysis(&self, ticket: AnalysisTicket) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.completions_tx.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let result = with_timeout(timeout, gateway.analyze(&ticket.image)).await;
            // ループ終了後の送信失敗は無視
            let _ = tx.send(Completion::Analysis {
                generation: ticket.generation,
                result,
            });
        });
    }

    fn spawn_search(&self, ticket: SearchTicket) {
        tracing::debug!("Step2開始 {}: {}件", ticket.generation, ticket.items.len());
        let gateway = Arc::clone(&self.gateway);
        let tx = self.completions_tx.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let result = with_timeout(timeout, gateway.find_similar(&ticket.items)).await;
            let _ = tx.send(Completion::Search {
                generation: ticket.generation,
                result,
            });
        });
    }

    fn publish(&self) {
        self.updates.send_replace(SessionUpdate {
            events_processed: self.events_processed,
            acquiring: self.pending_acquisitions > 0,
            snapshot: self.orchestrator.snapshot().clone(),
        });
    }
}

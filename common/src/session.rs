//! セッション状態機械
//!
//! 画像取得 → Step1（服装解析）→ Step2（類似アイテム検索）の進行を管理する。
//! I/Oは持たない。APIの呼び出しはチケットとして呼び出し側に返し、
//! 結果は世代番号付きで戻してもらう。
//!
//! - 新しい画像の投入やリセットで世代が進み、古い世代の応答は破棄される
//! - Step2はStep1成功時に明示的に開始し、同一世代では一度しか走らない

use serde::Serialize;

use crate::error::{AnalysisError, InputError, SearchError};
use crate::types::{
    AnalyzedItem, GroundingChunk, ImagePayload, InputMode, OutfitAnalysisResult,
    SimilarItemsSearchResult,
};

/// リクエストの世代番号（単調増加）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Generation(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Step1の実行依頼
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    pub generation: Generation,
    pub image: ImagePayload,
}

/// Step2の実行依頼
#[derive(Debug, Clone)]
pub struct SearchTicket {
    pub generation: Generation,
    pub items: Vec<AnalyzedItem>,
}

/// 状態から導出される進行段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    ImageCaptured,
    Analyzing,
    Analyzed,
    Searching,
    Searched,
}

/// 表示側に渡す読み取り専用のスナップショット
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    #[serde(skip)]
    pub image: Option<ImagePayload>,
    pub analysis: Option<OutfitAnalysisResult>,
    pub search_result: Option<SimilarItemsSearchResult>,
    pub grounding_sources: Option<Vec<GroundingChunk>>,
    pub is_analyzing: bool,
    pub is_searching: bool,
    pub error: Option<String>,
    pub input_mode: InputMode,
}

impl SessionSnapshot {
    pub fn phase(&self) -> SessionPhase {
        if self.is_analyzing {
            SessionPhase::Analyzing
        } else if self.is_searching {
            SessionPhase::Searching
        } else if self.search_result.is_some() {
            SessionPhase::Searched
        } else if self.analysis.is_some() {
            SessionPhase::Analyzed
        } else if self.image.is_some() {
            SessionPhase::ImageCaptured
        } else {
            SessionPhase::Idle
        }
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.is_analyzing || self.is_searching
    }

    /// 入力方法の選択画面を出すか
    pub fn shows_mode_chooser(&self) -> bool {
        self.input_mode == InputMode::None && self.image.is_none()
    }

    pub fn shows_analysis(&self) -> bool {
        self.analysis.is_some() && !self.is_analyzing
    }

    pub fn shows_search_result(&self) -> bool {
        self.search_result.is_some() && !self.is_searching
    }

    /// 両方の結果が揃い、読み込み中でないときだけ共有できる
    pub fn can_share(&self) -> bool {
        self.analysis.is_some() && self.search_result.is_some() && !self.is_busy()
    }
}

/// 「やり直し / 入力切替」操作の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSwitch {
    /// 読み込み中のため無視
    Ignored,
    /// 全リセット。画像を破棄した場合は true
    StartedOver { discarded_image: bool },
    /// 画像なしで入力方法だけ切り替え
    Switched(InputMode),
}

/// セッションの状態を一元管理するコントローラ
#[derive(Debug, Default)]
pub struct SessionOrchestrator {
    state: SessionSnapshot,
    generation: Generation,
    /// Step2を開始済みの世代
    searched: Option<Generation>,
}

impl SessionOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation
    }

    /// 新しい画像を投入し、Step1のチケットを返す
    ///
    /// 前回の結果・エラーは消え、実行中の応答はすべて古い世代になる
    pub fn submit_image(&mut self, image: ImagePayload) -> AnalysisTicket {
        self.generation = self.generation.next();
        self.searched = None;

        self.state.analysis = None;
        self.state.search_result = None;
        self.state.grounding_sources = None;
        self.state.error = None;
        self.state.is_searching = false;
        self.state.image = Some(image.clone());
        self.state.is_analyzing = true;

        AnalysisTicket {
            generation: self.generation,
            image,
        }
    }

    /// Step1成功。現行世代なら保存し、必要ならStep2のチケットを返す
    pub fn on_analysis_success(
        &mut self,
        generation: Generation,
        result: OutfitAnalysisResult,
    ) -> Option<SearchTicket> {
        if !self.accepts_analysis(generation) {
            return None;
        }
        self.state.analysis = Some(result);
        self.state.is_analyzing = false;
        self.next_search()
    }

    /// Step1失敗。画像は残す。反映した場合は true
    pub fn on_analysis_failure(&mut self, generation: Generation, error: AnalysisError) -> bool {
        if !self.accepts_analysis(generation) {
            return false;
        }
        self.state.analysis = None;
        self.state.is_analyzing = false;
        self.state.error = Some(error.0);
        true
    }

    /// Step2の開始判定
    ///
    /// 解析結果あり・アイテムあり・どちらも読み込み中でない・検索結果なし・
    /// この世代で未実行、のときだけチケットを返す。
    /// アイテムが空なら検索結果と出典を明示的に消す
    pub fn next_search(&mut self) -> Option<SearchTicket> {
        let items = match self.state.analysis.as_ref() {
            None => return None,
            Some(analysis) if !analysis.has_items() => {
                self.state.search_result = None;
                self.state.grounding_sources = None;
                return None;
            }
            Some(analysis) => &analysis.identified_clothing,
        };

        if self.state.is_analyzing
            || self.state.is_searching
            || self.state.search_result.is_some()
            || self.searched == Some(self.generation)
        {
            return None;
        }

        let items = items.clone();
        self.searched = Some(self.generation);
        self.state.is_searching = true;
        self.state.error = None;

        Some(SearchTicket {
            generation: self.generation,
            items,
        })
    }

    /// Step2成功
    pub fn on_search_success(
        &mut self,
        generation: Generation,
        result: SimilarItemsSearchResult,
        sources: Vec<GroundingChunk>,
    ) -> bool {
        if !self.accepts_search(generation) {
            return false;
        }
        self.state.search_result = Some(result);
        self.state.grounding_sources = Some(sources);
        self.state.is_searching = false;
        true
    }

    /// Step2失敗。検索結果と出典は空のまま
    pub fn on_search_failure(&mut self, generation: Generation, error: SearchError) -> bool {
        if !self.accepts_search(generation) {
            return false;
        }
        self.state.search_result = None;
        self.state.grounding_sources = None;
        self.state.is_searching = false;
        self.state.error = Some(error.0);
        true
    }

    /// 入力側のエラー。セッションを消してからエラーだけ表示する
    ///
    /// 画像を破棄した場合は true（呼び出し側で入力ソースをクリアする）
    pub fn report_input_error(&mut self, error: InputError) -> bool {
        let discarded = self.reset(true);
        self.state.error = Some(error.0);
        discarded
    }

    pub fn dismiss_error(&mut self) {
        self.state.error = None;
    }

    /// 全状態をクリア。実行中の応答は以後破棄される
    ///
    /// 画像を破棄した場合は true
    pub fn reset(&mut self, preserve_input_mode: bool) -> bool {
        let discarded = self.state.image.is_some();
        let input_mode = if preserve_input_mode {
            self.state.input_mode
        } else {
            InputMode::None
        };

        self.generation = self.generation.next();
        self.searched = None;
        self.state = SessionSnapshot {
            input_mode,
            ..Default::default()
        };
        discarded
    }

    pub fn set_input_mode(&mut self, mode: InputMode) {
        self.state.input_mode = mode;
    }

    /// 「やり直し / Webcam⇔Upload切替」ボタン相当
    pub fn switch_input_or_start_over(&mut self) -> SourceSwitch {
        if self.state.is_busy() {
            return SourceSwitch::Ignored;
        }
        if self.state.image.is_some() {
            let discarded_image = self.reset(false);
            return SourceSwitch::StartedOver { discarded_image };
        }
        match self.state.input_mode {
            InputMode::Webcam => {
                self.state.input_mode = InputMode::Upload;
                SourceSwitch::Switched(InputMode::Upload)
            }
            InputMode::Upload => {
                self.state.input_mode = InputMode::Webcam;
                SourceSwitch::Switched(InputMode::Webcam)
            }
            InputMode::None => {
                let discarded_image = self.reset(false);
                SourceSwitch::StartedOver { discarded_image }
            }
        }
    }

    fn accepts_analysis(&self, generation: Generation) -> bool {
        self.is_current(generation) && self.state.is_analyzing
    }

    fn accepts_search(&self, generation: Generation) -> bool {
        self.is_current(generation) && self.state.is_searching
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(data: &str) -> ImagePayload {
        ImagePayload::new(data, "image/jpeg").unwrap()
    }

    fn item(name: &str) -> AnalyzedItem {
        AnalyzedItem {
            item_name: name.to_string(),
            item_type: "Top".to_string(),
            color: "Black".to_string(),
            ..Default::default()
        }
    }

    fn analysis(items: Vec<AnalyzedItem>) -> OutfitAnalysisResult {
        OutfitAnalysisResult {
            identified_clothing: items,
            overall_impression: "Clean and simple.".to_string(),
        }
    }

    // =============================================
    // Step1
    // =============================================

    #[test]
    fn test_submit_image_starts_analysis() {
        let mut session = SessionOrchestrator::new();
        assert_eq!(session.snapshot().phase(), SessionPhase::Idle);

        let ticket = session.submit_image(image("AAAA"));
        let state = session.snapshot();
        assert_eq!(ticket.image.data(), "AAAA");
        assert!(state.is_analyzing);
        assert!(state.has_image());
        assert_eq!(state.phase(), SessionPhase::Analyzing);
    }

    #[test]
    fn test_analysis_success_stores_result_once() {
        let mut session = SessionOrchestrator::new();
        let ticket = session.submit_image(image("AAAA"));

        let search = session.on_analysis_success(ticket.generation, analysis(vec![]));
        assert!(search.is_none());

        let state = session.snapshot();
        assert!(state.analysis.is_some());
        assert!(!state.is_analyzing);
        assert!(!state.is_searching);
        assert_eq!(state.phase(), SessionPhase::Analyzed);

        // 同じ世代の二重解決は反映しない
        assert!(session.on_analysis_success(ticket.generation, analysis(vec![item("A")])).is_none());
        assert!(session.snapshot().analysis.as_ref().unwrap().identified_clothing.is_empty());
    }

    #[test]
    fn test_superseded_analysis_is_discarded() {
        let mut session = SessionOrchestrator::new();
        let first = session.submit_image(image("FIRST"));
        let second = session.submit_image(image("SECOND"));

        assert!(session.on_analysis_success(first.generation, analysis(vec![item("old")])).is_none());
        assert!(session.snapshot().analysis.is_none());
        assert!(session.snapshot().is_analyzing);

        assert!(!session.on_analysis_failure(first.generation, AnalysisError::new("late failure")));
        assert!(session.snapshot().error.is_none());

        let search = session.on_analysis_success(second.generation, analysis(vec![item("new")]));
        assert!(search.is_some());
        let state = session.snapshot();
        assert_eq!(state.image.as_ref().unwrap().data(), "SECOND");
        assert_eq!(state.analysis.as_ref().unwrap().identified_clothing[0].item_name, "new");
    }

    #[test]
    fn test_analysis_failure_keeps_image() {
        let mut session = SessionOrchestrator::new();
        let ticket = session.submit_image(image("X"));

        assert!(session.on_analysis_failure(ticket.generation, AnalysisError::new("network error")));

        let state = session.snapshot();
        assert_eq!(state.error.as_deref(), Some("network error"));
        assert!(state.analysis.is_none());
        assert_eq!(state.image.as_ref().unwrap().data(), "X");
        assert!(!state.is_busy());
        assert_eq!(state.phase(), SessionPhase::ImageCaptured);
    }

    // =============================================
    // Step2
    // =============================================

    #[test]
    fn test_empty_items_never_trigger_search() {
        let mut session = SessionOrchestrator::new();
        let ticket = session.submit_image(image("X"));

        assert!(session.on_analysis_success(ticket.generation, analysis(vec![])).is_none());
        assert!(session.next_search().is_none());
        assert!(session.snapshot().search_result.is_none());
        assert!(session.snapshot().grounding_sources.is_none());
        assert!(!session.snapshot().is_searching);
    }

    #[test]
    fn test_search_triggered_exactly_once() {
        let mut session = SessionOrchestrator::new();
        let ticket = session.submit_image(image("X"));

        let search = session
            .on_analysis_success(ticket.generation, analysis(vec![item("A"), item("B")]))
            .expect("search should start");
        assert_eq!(search.generation, ticket.generation);
        assert_eq!(search.items.len(), 2);
        assert!(session.snapshot().is_searching);
        assert_eq!(session.snapshot().phase(), SessionPhase::Searching);

        // 再評価しても二重起動しない
        assert!(session.next_search().is_none());
        session.dismiss_error();
        session.set_input_mode(InputMode::Upload);
        assert!(session.next_search().is_none());
    }

    #[test]
    fn test_search_failure_does_not_retrigger() {
        let mut session = SessionOrchestrator::new();
        let ticket = session.submit_image(image("X"));
        let search = session
            .on_analysis_success(ticket.generation, analysis(vec![item("A")]))
            .unwrap();

        assert!(session.on_search_failure(search.generation, SearchError::new("quota exceeded")));
        let state = session.snapshot();
        assert_eq!(state.error.as_deref(), Some("quota exceeded"));
        assert!(state.search_result.is_none());
        assert!(state.grounding_sources.is_none());
        assert!(state.analysis.is_some());

        session.dismiss_error();
        assert!(session.snapshot().error.is_none());
        assert!(session.next_search().is_none());
    }

    #[test]
    fn test_full_pipeline_success() {
        let mut session = SessionOrchestrator::new();
        let ticket = session.submit_image(image("X"));
        let search = session
            .on_analysis_success(ticket.generation, analysis(vec![item("A"), item("B")]))
            .unwrap();

        let result = SimilarItemsSearchResult {
            similar_items_suggestions: vec![
                crate::types::SimilarItemSuggestionGroup {
                    original_item_query: "A".to_string(),
                    suggestions: vec![crate::types::ProductSuggestion {
                        product_name: "p1".to_string(),
                        shop_link: "https://shop.example/p1".to_string(),
                        ..Default::default()
                    }],
                },
                crate::types::SimilarItemSuggestionGroup {
                    original_item_query: "B".to_string(),
                    suggestions: vec![],
                },
            ],
        };
        let sources = vec![GroundingChunk {
            web: Some(crate::types::WebGroundingSource {
                uri: "https://g1.example".to_string(),
                title: "g1".to_string(),
            }),
        }];

        assert!(session.on_search_success(search.generation, result.clone(), sources.clone()));

        let state = session.snapshot();
        assert!(state.analysis.is_some());
        assert_eq!(state.search_result.as_ref(), Some(&result));
        assert_eq!(state.grounding_sources.as_ref(), Some(&sources));
        assert!(!state.is_busy());
        assert!(state.error.is_none());
        assert!(state.can_share());
        assert_eq!(state.phase(), SessionPhase::Searched);
    }

    #[test]
    fn test_stale_search_after_new_image_is_discarded() {
        let mut session = SessionOrchestrator::new();
        let first = session.submit_image(image("X"));
        let search = session
            .on_analysis_success(first.generation, analysis(vec![item("A")]))
            .unwrap();

        session.submit_image(image("Y"));
        assert!(!session.snapshot().is_searching);
        assert!(!session.on_search_success(search.generation, SimilarItemsSearchResult::default(), vec![]));
        assert!(session.snapshot().search_result.is_none());
    }

    // =============================================
    // リセット・入力切替
    // =============================================

    #[test]
    fn test_reset_preserving_input_mode() {
        let mut session = SessionOrchestrator::new();
        session.set_input_mode(InputMode::Webcam);
        let ticket = session.submit_image(image("X"));

        assert!(session.reset(true));
        let state = session.snapshot();
        assert_eq!(state.input_mode, InputMode::Webcam);
        assert!(!state.has_image());
        assert!(!state.is_busy());
        assert!(state.error.is_none());

        // リセット前の応答は反映しない
        assert!(session.on_analysis_success(ticket.generation, analysis(vec![item("A")])).is_none());
        assert!(session.snapshot().analysis.is_none());
    }

    #[test]
    fn test_reset_full_restart() {
        let mut session = SessionOrchestrator::new();
        session.set_input_mode(InputMode::Upload);
        assert!(!session.reset(false));
        assert_eq!(session.snapshot().input_mode, InputMode::None);
        assert!(session.snapshot().shows_mode_chooser());
    }

    #[test]
    fn test_input_error_does_not_start_analysis() {
        let mut session = SessionOrchestrator::new();
        session.set_input_mode(InputMode::Upload);

        let discarded = session.report_input_error(InputError::new("Error reading file."));
        assert!(!discarded);
        let state = session.snapshot();
        assert_eq!(state.error.as_deref(), Some("Error reading file."));
        assert!(!state.is_analyzing);
        assert_eq!(state.input_mode, InputMode::Upload);
    }

    #[test]
    fn test_new_error_overwrites_old() {
        let mut session = SessionOrchestrator::new();
        session.report_input_error(InputError::new("camera unavailable"));
        let ticket = session.submit_image(image("X"));
        assert!(session.snapshot().error.is_none());
        session.on_analysis_failure(ticket.generation, AnalysisError::new("bad response"));
        assert_eq!(session.snapshot().error.as_deref(), Some("bad response"));
    }

    #[test]
    fn test_set_input_mode_keeps_inflight_request() {
        let mut session = SessionOrchestrator::new();
        let ticket = session.submit_image(image("X"));
        session.set_input_mode(InputMode::Webcam);
        assert!(session.is_current(ticket.generation));
        assert!(session.snapshot().is_analyzing);
    }

    #[test]
    fn test_switch_input_or_start_over() {
        let mut session = SessionOrchestrator::new();
        session.set_input_mode(InputMode::Webcam);
        assert_eq!(
            session.switch_input_or_start_over(),
            SourceSwitch::Switched(InputMode::Upload)
        );
        assert_eq!(
            session.switch_input_or_start_over(),
            SourceSwitch::Switched(InputMode::Webcam)
        );

        let ticket = session.submit_image(image("X"));
        assert_eq!(session.switch_input_or_start_over(), SourceSwitch::Ignored);

        session.on_analysis_failure(ticket.generation, AnalysisError::new("boom"));
        assert_eq!(
            session.switch_input_or_start_over(),
            SourceSwitch::StartedOver { discarded_image: true }
        );
        assert_eq!(session.snapshot().input_mode, InputMode::None);
    }

    #[test]
    fn test_snapshot_serialize_skips_image() {
        let mut session = SessionOrchestrator::new();
        session.submit_image(image("SECRETBASE64"));
        let json = serde_json::to_string(session.snapshot()).unwrap();
        assert!(!json.contains("SECRETBASE64"));
        assert!(json.contains("\"is_analyzing\":true"));
        assert!(json.contains("\"input_mode\":\"none\""));
    }
}

/// Dashboard view state
///
/// Filters, pagination and the currently displayed page of spikes. Every filter
/// mutation resets pagination to page 1 and bumps the query generation, so table
/// responses for superseded queries are discarded instead of overwriting fresher data.
use chrono::{DateTime, TimeZone, Utc};
use smol_str::SmolStr;
use spike_data::{SpikeFilters, SpikeQuery, SpikeRecord, SpikesPage};

#[derive(Debug, Clone)]
pub struct DashboardState {
    filters: SpikeFilters,
    page: u32,
    limit: u32,
    generation: u64,
    /// Rows of the displayed page
    pub rows: Vec<SpikeRecord>,
    /// Total spikes matching the filters, across pages
    pub total: u64,
    /// When the displayed page was last refreshed
    pub last_updated: Option<DateTime<Utc>>,
    /// Show the loading indicator (first load of a parameter set only)
    pub loading: bool,
    /// Last table fetch error, cleared by the next success
    pub last_error: Option<String>,
    /// Case-insensitive symbol substring applied to the displayed rows
    pub search: String,
    /// Symbols offered by `GET /symbols`
    pub known_symbols: Vec<SmolStr>,
}

impl DashboardState {
    pub fn new(filters: SpikeFilters, limit: u32) -> Self {
        Self {
            filters,
            page: 1,
            limit: limit.max(1),
            generation: 0,
            rows: Vec::new(),
            total: 0,
            last_updated: None,
            loading: true,
            last_error: None,
            search: String::new(),
            known_symbols: Vec::new(),
        }
    }

    pub fn filters(&self) -> &SpikeFilters {
        &self.filters
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of pages for the current total, at least 1.
    pub fn page_count(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.limit));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count()
    }

    /// Move to the next page. Returns false when already on the last page.
    pub fn next_page(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page += 1;
        self.generation += 1;
        true
    }

    /// Move to the previous page. Returns false when already on page 1.
    pub fn prev_page(&mut self) -> bool {
        if !self.has_prev() {
            return false;
        }
        self.page -= 1;
        self.generation += 1;
        true
    }

    /// Jump back to page 1. Returns false when already there.
    pub fn first_page(&mut self) -> bool {
        if self.page == 1 {
            return false;
        }
        self.page = 1;
        self.generation += 1;
        true
    }

    /// Replace the filters. Returns true when they actually changed.
    pub fn set_filters(&mut self, filters: SpikeFilters) -> bool {
        if filters == self.filters {
            return false;
        }
        self.filters = filters;
        self.page = 1;
        self.generation += 1;
        self.loading = true;
        true
    }

    /// Step to the next threshold offered for the segment, wrapping around.
    pub fn cycle_threshold(&mut self) -> bool {
        let thresholds = self.filters.segment.thresholds();
        let next = thresholds
            .iter()
            .position(|threshold| *threshold == self.filters.volume_threshold)
            .map(|index| thresholds[(index + 1) % thresholds.len()])
            .unwrap_or(self.filters.segment.default_threshold());

        self.update_filters(|filters| filters.volume_threshold = next)
    }

    pub fn toggle_date(&mut self) -> bool {
        self.update_filters(|filters| filters.date = filters.date.toggle())
    }

    pub fn toggle_sort_by(&mut self) -> bool {
        self.update_filters(|filters| filters.sort_by = filters.sort_by.toggle())
    }

    pub fn toggle_sort_order(&mut self) -> bool {
        self.update_filters(|filters| filters.sort_order = filters.sort_order.toggle())
    }

    /// Add a symbol to the allow-list if absent.
    pub fn add_symbol(&mut self, symbol: &str) -> bool {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() || self.filters.symbols.iter().any(|s| s == symbol.as_str()) {
            return false;
        }
        self.update_filters(|filters| filters.symbols.push(SmolStr::new(&symbol)))
    }

    /// Replace the symbol allow-list.
    pub fn set_symbols(&mut self, symbols: Vec<SmolStr>) -> bool {
        self.update_filters(|filters| filters.symbols = symbols)
    }

    pub fn clear_symbols(&mut self) -> bool {
        self.set_symbols(Vec::new())
    }

    /// Symbols not present in the known symbol list. Empty while the list is unknown.
    pub fn unknown_symbols<'a>(&self, symbols: &'a [SmolStr]) -> Vec<&'a SmolStr> {
        if self.known_symbols.is_empty() {
            return Vec::new();
        }
        symbols
            .iter()
            .filter(|symbol| !self.known_symbols.contains(*symbol))
            .collect()
    }

    fn update_filters<F>(&mut self, mutate: F) -> bool
    where
        F: FnOnce(&mut SpikeFilters),
    {
        let mut filters = self.filters.clone();
        mutate(&mut filters);
        self.set_filters(filters)
    }

    /// Query for the displayed page, tagged with the generation it belongs to.
    pub fn page_query<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> (u64, SpikeQuery) {
        (
            self.generation,
            self.filters.page_query(self.page, self.limit, now),
        )
    }

    /// Apply a table response. Stale generations are ignored; returns whether applied.
    pub fn apply_page(
        &mut self,
        generation: u64,
        page: SpikesPage,
        received: DateTime<Utc>,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.rows = page.spikes;
        self.total = page.total;
        self.last_updated = Some(page.last_updated.unwrap_or(received));
        self.loading = false;
        self.last_error = None;
        true
    }

    /// Record a failed table fetch. Rows from the last good response are kept.
    pub fn apply_error(&mut self, generation: u64, error: impl ToString) -> bool {
        if generation != self.generation {
            return false;
        }
        self.loading = false;
        self.last_error = Some(error.to_string());
        true
    }

    /// Rows matching the local search text.
    pub fn visible_rows(&self) -> impl Iterator<Item = &SpikeRecord> {
        let needle = self.search.trim().to_lowercase();
        self.rows
            .iter()
            .filter(move |row| needle.is_empty() || row.symbol.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spike_data::{DateOption, Segment, SortBy, SortOrder};

    fn page(symbols: &[&str], total: u64) -> SpikesPage {
        SpikesPage {
            spikes: symbols
                .iter()
                .map(|symbol| SpikeRecord {
                    symbol: SmolStr::new(symbol),
                    volume_delta: 100_000.0,
                    timestamp: Utc::now(),
                    ltp: 10.0,
                    open_price_of_candle: 10.0,
                })
                .collect(),
            total,
            last_updated: None,
        }
    }

    #[test]
    fn test_page_count() {
        struct TestCase {
            total: u64,
            limit: u32,
            expected: u32,
        }

        let tests = vec![
            // TC0: no results still shows one page
            TestCase {
                total: 0,
                limit: 100,
                expected: 1,
            },
            // TC1: exact multiple
            TestCase {
                total: 200,
                limit: 100,
                expected: 2,
            },
            // TC2: remainder rounds up
            TestCase {
                total: 201,
                limit: 100,
                expected: 3,
            },
            // TC3: options page size
            TestCase {
                total: 41,
                limit: 20,
                expected: 3,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let mut state = DashboardState::new(SpikeFilters::default(), test.limit);
            state.total = test.total;
            assert_eq!(state.page_count(), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_pagination_bounds() {
        let mut state = DashboardState::new(SpikeFilters::default(), 100);
        assert!(state.apply_page(0, page(&["A"], 250), Utc::now()));

        assert!(!state.has_prev());
        assert!(!state.prev_page());
        assert!(state.next_page());
        assert!(state.next_page());
        assert_eq!(state.page(), 3);
        assert!(!state.has_next());
        assert!(!state.next_page());
        assert!(state.prev_page());
        assert_eq!(state.page(), 2);
        assert!(state.first_page());
        assert_eq!(state.page(), 1);
        assert!(!state.first_page());
    }

    #[test]
    fn test_filter_change_resets_page_and_shows_loader() {
        let mut state = DashboardState::new(SpikeFilters::default(), 100);
        state.apply_page(0, page(&["A"], 500), Utc::now());
        state.next_page();
        assert_eq!(state.page(), 2);
        assert!(!state.loading);

        assert!(state.cycle_threshold());
        assert_eq!(state.filters().volume_threshold, 200_000);
        assert_eq!(state.page(), 1);
        assert!(state.loading);

        // Wraps around
        assert!(state.cycle_threshold());
        assert_eq!(state.filters().volume_threshold, 50_000);

        assert!(state.toggle_date());
        assert_eq!(state.filters().date, DateOption::Yesterday);
        assert!(state.toggle_sort_by());
        assert_eq!(state.filters().sort_by, SortBy::VolumeDelta);
        assert!(state.toggle_sort_order());
        assert_eq!(state.filters().sort_order, SortOrder::Asc);

        // Same filters are not a change
        let same = state.filters().clone();
        assert!(!state.set_filters(same));
    }

    #[test]
    fn test_stale_responses_are_discarded() {
        let mut state = DashboardState::new(SpikeFilters::default(), 100);
        let (stale_generation, _) = state.page_query(&Utc::now());

        state.add_symbol("aapl");
        let (generation, query) = state.page_query(&Utc::now());
        assert_ne!(stale_generation, generation);
        assert_eq!(query.symbols, vec![SmolStr::new("AAPL")]);

        assert!(!state.apply_page(stale_generation, page(&["OLD"], 1), Utc::now()));
        assert!(state.rows.is_empty());
        assert!(!state.apply_error(stale_generation, "timeout"));
        assert!(state.last_error.is_none());

        assert!(state.apply_page(generation, page(&["AAPL"], 1), Utc::now()));
        assert_eq!(state.rows.len(), 1);
    }

    #[test]
    fn test_error_keeps_last_good_rows() {
        let mut state = DashboardState::new(SpikeFilters::default(), 100);
        state.apply_page(0, page(&["A", "B"], 2), Utc::now());

        assert!(state.apply_error(0, "HTTP error 503"));
        assert_eq!(state.rows.len(), 2);
        assert_eq!(state.last_error.as_deref(), Some("HTTP error 503"));
        assert!(!state.loading);
    }

    #[test]
    fn test_symbols_and_search() {
        let mut state = DashboardState::new(SpikeFilters::for_segment(Segment::Options), 20);
        assert!(state.add_symbol("nifty"));
        assert!(!state.add_symbol("NIFTY"));
        assert!(!state.add_symbol("  "));
        assert_eq!(state.filters().symbols, vec![SmolStr::new("NIFTY")]);

        state.known_symbols = vec![SmolStr::new("NIFTY"), SmolStr::new("BANKNIFTY")];
        let candidates = vec![SmolStr::new("BANKNIFTY"), SmolStr::new("FOO")];
        assert_eq!(state.unknown_symbols(&candidates), vec![&SmolStr::new("FOO")]);

        assert!(state.clear_symbols());
        assert!(state.filters().symbols.is_empty());

        let generation = state.generation();
        state.apply_page(
            generation,
            page(&["NIFTY24JUN", "BANKNIFTY24JUN", "RELIANCE"], 3),
            Utc::now(),
        );
        state.search = "nifty".to_string();
        let visible: Vec<&str> = state.visible_rows().map(|row| row.symbol.as_str()).collect();
        assert_eq!(visible, vec!["NIFTY24JUN", "BANKNIFTY24JUN"]);
    }
}

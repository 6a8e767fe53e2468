//! Window-handle resolution: poll the process tree of a freshly started
//! process until the window worth placing shows up.

use std::collections::HashSet;
use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::desktop::{Desktop, Pid, WindowHandle};
use crate::ps::ProcessTreeScanner;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWindow {
    pub handle: WindowHandle,
    /// Windows passed over because of the skip count, oldest first.
    pub skipped: Vec<WindowHandle>,
}

/// Resolves launched processes to their windows. Keeps every handle it has
/// ever seen, so one instance should live as long as the application and be
/// shared by all launches.
#[derive(Debug)]
pub struct WindowHandleResolver {
    claimed: HashSet<WindowHandle>,
    scanner: ProcessTreeScanner,
    poll_interval: Duration,
}

impl Default for WindowHandleResolver {
    fn default() -> Self {
        Self::new(ProcessTreeScanner::default(), DEFAULT_POLL_INTERVAL)
    }
}

impl WindowHandleResolver {
    pub fn new(scanner: ProcessTreeScanner, poll_interval: Duration) -> Self {
        Self {
            claimed: HashSet::new(),
            scanner,
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn is_claimed(&self, handle: WindowHandle) -> bool {
        self.claimed.contains(&handle)
    }

    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }

    /// Polls `root` and its descendants until more than `skip_count` distinct,
    /// unclaimed windows have been seen, and returns the last of them.
    ///
    /// Returns `None` once `timeout` has elapsed, or as soon as `root` is no
    /// longer running. Every window seen during the call is claimed, whatever
    /// the outcome, so later calls never hand it out again.
    pub fn resolve<D: Desktop + ?Sized>(
        &mut self,
        desktop: &D,
        root: Pid,
        skip_count: u32,
        timeout: Duration,
    ) -> Option<ResolvedWindow> {
        let started = Instant::now();
        // A timeout too large for `Instant` means no deadline at all.
        let deadline = started.checked_add(timeout);
        let mut seen: Vec<WindowHandle> = Vec::new();
        let mut rounds = 0u32;

        info!(
            event = "core.resolver.resolve_started",
            root,
            skip_count,
            timeout_ms = timeout.as_millis() as u64
        );

        let accepted = loop {
            rounds += 1;
            let snapshot = desktop.list_processes();
            if !snapshot.iter().any(|p| p.id == root) {
                info!(event = "core.resolver.root_exited", root, rounds);
                break None;
            }

            // The started process may own the window itself, so it is looked at
            // before its descendants.
            let mut candidates = vec![root];
            candidates.extend(self.scanner.descendants_in(desktop, &snapshot, root));
            if let Some(handle) = self.next_candidate(desktop, &candidates, &seen) {
                debug!(
                    event = "core.resolver.candidate_found",
                    root,
                    handle = %handle,
                    seen = seen.len() + 1
                );
                seen.push(handle);
            }

            if seen.len() > skip_count as usize {
                break seen.last().copied();
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        info!(
                            event = "core.resolver.timed_out",
                            root,
                            rounds,
                            seen = seen.len()
                        );
                        break None;
                    }
                    self.poll_interval.min(deadline - now)
                }
                None => self.poll_interval,
            };
            sleep(pause);
        };

        self.claimed.extend(seen.iter().copied());

        let resolved = accepted.map(|handle| ResolvedWindow {
            handle,
            skipped: seen.iter().copied().filter(|h| *h != handle).collect(),
        });
        if let Some(resolved) = &resolved {
            info!(
                event = "core.resolver.resolve_completed",
                root,
                handle = %resolved.handle,
                skipped = resolved.skipped.len(),
                rounds,
                elapsed_ms = started.elapsed().as_millis() as u64
            );
        }
        resolved
    }

    /// First window among `pids` that is neither claimed by an earlier launch
    /// nor already seen by this one.
    fn next_candidate<D: Desktop + ?Sized>(
        &self,
        desktop: &D,
        pids: &[Pid],
        seen: &[WindowHandle],
    ) -> Option<WindowHandle> {
        pids
            .iter()
            .filter_map(|pid| desktop.main_window_of(*pid))
            .find(|handle| !self.claimed.contains(handle) && !seen.contains(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::fake::{FakeDesktop, hwnd};

    const ROOT: Pid = 500;
    const POLL: Duration = Duration::from_millis(10);

    fn resolver() -> WindowHandleResolver {
        WindowHandleResolver::new(ProcessTreeScanner::new(1), POLL)
    }

    // Root 500 with children 501, 502, 503 whose windows A, B, C appear on
    // rounds 1, 2 and 3.
    fn staggered_desktop() -> FakeDesktop {
        FakeDesktop::new()
            .with_process(ROOT, 1)
            .with_process(501, ROOT)
            .with_process(502, ROOT)
            .with_process(503, ROOT)
            .with_window_from_round(501, hwnd(0xA), 1)
            .with_window_from_round(502, hwnd(0xB), 2)
            .with_window_from_round(503, hwnd(0xC), 3)
    }

    #[test]
    fn test_skip_zero_takes_first_window_of_first_round() {
        let desktop = staggered_desktop();
        let mut resolver = resolver();
        let resolved = resolver
            .resolve(&desktop, ROOT, 0, Duration::from_secs(5))
            .unwrap();
        assert_eq!(resolved.handle, hwnd(0xA));
        assert!(resolved.skipped.is_empty());
        assert_eq!(desktop.rounds(), 1);
    }

    #[test]
    fn test_skip_count_passes_over_earlier_windows() {
        let desktop = staggered_desktop();
        let mut resolver = resolver();
        let resolved = resolver
            .resolve(&desktop, ROOT, 1, Duration::from_secs(5))
            .unwrap();

        assert_eq!(resolved.handle, hwnd(0xB));
        assert_eq!(resolved.skipped, vec![hwnd(0xA)]);
        assert!(resolver.is_claimed(hwnd(0xA)));
        assert!(resolver.is_claimed(hwnd(0xB)));
        assert!(!resolver.is_claimed(hwnd(0xC)));
    }

    #[test]
    fn test_claimed_window_is_never_returned_again() {
        let desktop = FakeDesktop::new()
            .with_process(ROOT, 1)
            .with_process(501, ROOT)
            .with_window(501, hwnd(0x42));
        let mut resolver = resolver();

        let first = resolver.resolve(&desktop, ROOT, 0, Duration::from_secs(5));
        assert_eq!(first.map(|r| r.handle), Some(hwnd(0x42)));

        let second = resolver.resolve(&desktop, ROOT, 0, Duration::from_millis(50));
        assert_eq!(second, None);
        assert_eq!(resolver.claimed_count(), 1);
    }

    #[test]
    fn test_later_launch_gets_the_next_window() {
        let desktop = FakeDesktop::new()
            .with_process(ROOT, 1)
            .with_process(501, ROOT)
            .with_process(502, ROOT)
            .with_window(501, hwnd(0x1))
            .with_window(502, hwnd(0x2));
        let mut resolver = resolver();

        let first = resolver.resolve(&desktop, ROOT, 0, Duration::from_secs(5));
        let second = resolver.resolve(&desktop, ROOT, 0, Duration::from_secs(5));
        assert_eq!(first.map(|r| r.handle), Some(hwnd(0x1)));
        assert_eq!(second.map(|r| r.handle), Some(hwnd(0x2)));
    }

    #[test]
    fn test_timeout_bounds_when_no_window_appears() {
        let desktop = FakeDesktop::new()
            .with_process(ROOT, 1)
            .with_process(501, ROOT);
        let mut resolver = resolver();
        let timeout = Duration::from_millis(150);

        let started = Instant::now();
        let resolved = resolver.resolve(&desktop, ROOT, 0, timeout);
        let elapsed = started.elapsed();

        assert_eq!(resolved, None);
        assert!(elapsed >= timeout, "returned after {:?}", elapsed);
        // one poll interval plus generous scheduling slack
        assert!(elapsed < timeout + POLL + Duration::from_millis(200));
    }

    #[test]
    fn test_root_exit_aborts_early() {
        let desktop = FakeDesktop::new()
            .with_process(ROOT, 1)
            .with_process(501, ROOT)
            .with_exit_after_round(ROOT, 2);
        let mut resolver = resolver();

        let started = Instant::now();
        let resolved = resolver.resolve(&desktop, ROOT, 0, Duration::from_secs(10));
        assert_eq!(resolved, None);
        assert_eq!(desktop.rounds(), 3);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_unbounded_timeout_still_stops_on_root_exit() {
        let desktop = FakeDesktop::new()
            .with_process(ROOT, 1)
            .with_exit_after_round(ROOT, 1);
        let mut resolver = resolver();

        let resolved = resolver.resolve(&desktop, ROOT, 0, Duration::MAX);
        assert_eq!(resolved, None);
        assert_eq!(desktop.rounds(), 2);
    }

    #[test]
    fn test_windows_seen_before_timeout_are_claimed() {
        let desktop = staggered_desktop();
        let mut resolver = resolver();

        let resolved = resolver.resolve(&desktop, ROOT, 5, Duration::from_millis(100));
        assert_eq!(resolved, None);
        assert!(resolver.is_claimed(hwnd(0xA)));
        assert!(resolver.is_claimed(hwnd(0xB)));
        assert!(resolver.is_claimed(hwnd(0xC)));
    }

    #[test]
    fn test_grandchild_windows_are_found() {
        let desktop = FakeDesktop::new()
            .with_process(ROOT, 1)
            .with_process(501, ROOT)
            .with_process(601, 501)
            .with_process(701, 601)
            .with_window(701, hwnd(0x77));
        let mut resolver = resolver();
        let resolved = resolver.resolve(&desktop, ROOT, 0, Duration::from_secs(5));
        assert_eq!(resolved.map(|r| r.handle), Some(hwnd(0x77)));
    }

    #[test]
    fn test_root_window_comes_before_descendant_windows() {
        let desktop = FakeDesktop::new()
            .with_process(ROOT, 1)
            .with_process(501, ROOT)
            .with_window(ROOT, hwnd(0x99))
            .with_window(501, hwnd(0x98));
        let mut resolver = resolver();
        let resolved = resolver
            .resolve(&desktop, ROOT, 1, Duration::from_secs(5))
            .unwrap();
        assert_eq!(resolved.handle, hwnd(0x98));
        assert_eq!(resolved.skipped, vec![hwnd(0x99)]);
    }

    #[test]
    fn test_window_of_unrelated_process_is_ignored() {
        let desktop = FakeDesktop::new()
            .with_process(ROOT, 1)
            .with_process(900, 1)
            .with_window(900, hwnd(0x90));
        let mut resolver = resolver();
        let resolved = resolver.resolve(&desktop, ROOT, 0, Duration::from_millis(40));
        assert_eq!(resolved, None);
        assert!(!resolver.is_claimed(hwnd(0x90)));
    }
}

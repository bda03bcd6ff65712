//! Price-level scanning over the book's contiguous price arrays
//!
//! Pure queries over a sorted `&[i64]` prefix (best price at index 0). Two
//! implementations behind one tagged enum: a scalar baseline and an AVX2
//! variant that compares four prices per iteration. Both return identical
//! results for identical inputs — including unsorted ones — which the
//! property suite pins.

use crate::config::EngineConfig;
use tracing::info;

/// Stateless scanner strategy, selected once at engine construction.
///
/// The enum is matched once per call; each variant then runs its own tight
/// loop over the price array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceScanner {
    /// One comparison per iteration
    Scalar,
    /// Four i64 comparisons per iteration (AVX2)
    #[cfg(target_arch = "x86_64")]
    Vectorized,
}

impl PriceScanner {
    /// Pick an implementation from configuration and hardware capability.
    ///
    /// Scalar when `disable_simd` is set (configuration or the
    /// `CHRONOS_DISABLE_SIMD` environment variable folded into it) or when
    /// the CPU lacks AVX2; vectorized otherwise.
    #[must_use]
    pub fn select(config: &EngineConfig) -> Self {
        if config.disable_simd {
            info!("price scanner: scalar (SIMD disabled by configuration)");
            return Self::Scalar;
        }
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") {
                info!(lanes = avx2::LANE_COUNT, "price scanner: vectorized (AVX2)");
                return Self::Vectorized;
            }
        }
        info!("price scanner: scalar (SIMD unavailable on this CPU)");
        Self::Scalar
    }

    /// Find where a new price belongs in a sorted price array.
    ///
    /// For `descending` (bids) returns the first index with
    /// `prices[i] < new_price`; otherwise (asks) the first index with
    /// `prices[i] > new_price`; `prices.len()` when the price belongs at the
    /// end. An equal price never satisfies the strict comparison — the book
    /// joins the existing level instead of inserting.
    #[inline]
    #[must_use]
    pub fn find_insertion_point(&self, prices: &[i64], new_price: i64, descending: bool) -> usize {
        match self {
            Self::Scalar => scalar::find_insertion_point(prices, new_price, descending),
            #[cfg(target_arch = "x86_64")]
            // SAFETY: Vectorized is only constructed after AVX2 detection
            Self::Vectorized => unsafe {
                avx2::find_insertion_point(prices, new_price, descending)
            },
        }
    }

    /// Length of the contiguous matchable prefix from the top of book.
    ///
    /// For a buying aggressor sweeping asks: levels with
    /// `price <= limit_price`; for a selling aggressor sweeping bids: levels
    /// with `price >= limit_price`. Stops at the first mismatch.
    #[inline]
    #[must_use]
    pub fn count_matchable_levels(&self, prices: &[i64], limit_price: i64, is_buy: bool) -> usize {
        match self {
            Self::Scalar => scalar::count_matchable_levels(prices, limit_price, is_buy),
            #[cfg(target_arch = "x86_64")]
            // SAFETY: Vectorized is only constructed after AVX2 detection
            Self::Vectorized => unsafe {
                avx2::count_matchable_levels(prices, limit_price, is_buy)
            },
        }
    }

    /// First level tradeable against the limit price, if any.
    ///
    /// On a sorted array this is index 0 or nothing; specified independently
    /// of the sort invariant for callers that cannot assume it.
    #[inline]
    #[must_use]
    pub fn find_first_matchable_level(
        &self,
        prices: &[i64],
        limit_price: i64,
        is_buy: bool,
    ) -> Option<usize> {
        match self {
            Self::Scalar => scalar::find_first_matchable_level(prices, limit_price, is_buy),
            #[cfg(target_arch = "x86_64")]
            // SAFETY: Vectorized is only constructed after AVX2 detection
            Self::Vectorized => unsafe {
                avx2::find_first_matchable_level(prices, limit_price, is_buy)
            },
        }
    }
}

mod scalar {
    pub fn find_insertion_point(prices: &[i64], new_price: i64, descending: bool) -> usize {
        for (i, &price) in prices.iter().enumerate() {
            let before = if descending {
                price < new_price
            } else {
                price > new_price
            };
            if before {
                return i;
            }
        }
        prices.len()
    }

    pub fn count_matchable_levels(prices: &[i64], limit_price: i64, is_buy: bool) -> usize {
        let mut matched = 0;
        for &price in prices {
            let tradeable = if is_buy {
                price <= limit_price
            } else {
                price >= limit_price
            };
            if !tradeable {
                break;
            }
            matched += 1;
        }
        matched
    }

    pub fn find_first_matchable_level(
        prices: &[i64],
        limit_price: i64,
        is_buy: bool,
    ) -> Option<usize> {
        prices.iter().position(|&price| {
            if is_buy {
                price <= limit_price
            } else {
                price >= limit_price
            }
        })
    }
}

#[cfg(target_arch = "x86_64")]
mod avx2 {
    use core::arch::x86_64::{
        __m256i, _mm256_castsi256_pd, _mm256_cmpgt_epi64, _mm256_loadu_si256, _mm256_movemask_pd,
        _mm256_set1_epi64x,
    };

    /// i64 lanes per 256-bit register
    pub const LANE_COUNT: usize = 4;

    const LANE_MASK: u32 = (1 << LANE_COUNT) - 1;

    /// Sign-bit mask of the four lanes: bit n set when lane n compared true
    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn movemask(cmp: __m256i) -> u32 {
        _mm256_movemask_pd(_mm256_castsi256_pd(cmp)) as u32
    }

    /// # Safety
    /// Caller must ensure the CPU supports AVX2.
    #[target_feature(enable = "avx2")]
    pub unsafe fn find_insertion_point(prices: &[i64], new_price: i64, descending: bool) -> usize {
        let count = prices.len();
        let broadcast = _mm256_set1_epi64x(new_price);
        let mut i = 0;

        while i + LANE_COUNT <= count {
            let lane = _mm256_loadu_si256(prices.as_ptr().add(i).cast());
            // bids (descending): first price < new_price; asks: first price > new_price
            let cmp = if descending {
                _mm256_cmpgt_epi64(broadcast, lane)
            } else {
                _mm256_cmpgt_epi64(lane, broadcast)
            };
            let mask = movemask(cmp);
            if mask != 0 {
                return i + mask.trailing_zeros() as usize;
            }
            i += LANE_COUNT;
        }

        // Scalar tail for count % LANE_COUNT
        while i < count {
            let before = if descending {
                prices[i] < new_price
            } else {
                prices[i] > new_price
            };
            if before {
                return i;
            }
            i += 1;
        }

        count
    }

    /// # Safety
    /// Caller must ensure the CPU supports AVX2.
    #[target_feature(enable = "avx2")]
    pub unsafe fn count_matchable_levels(prices: &[i64], limit_price: i64, is_buy: bool) -> usize {
        let count = prices.len();
        let broadcast = _mm256_set1_epi64x(limit_price);
        let mut matched = 0;
        let mut i = 0;

        while i + LANE_COUNT <= count {
            let lane = _mm256_loadu_si256(prices.as_ptr().add(i).cast());
            // A lane misses when the strict inequality holds against the limit:
            // buy sweeping asks: price > limit; sell sweeping bids: price < limit
            let miss = if is_buy {
                _mm256_cmpgt_epi64(lane, broadcast)
            } else {
                _mm256_cmpgt_epi64(broadcast, lane)
            };
            let miss_mask = movemask(miss);
            if miss_mask != 0 {
                // Prefix length inside this register, same as the scalar break
                return matched + miss_mask.trailing_zeros() as usize;
            }
            matched += LANE_COUNT;
            i += LANE_COUNT;
        }

        while i < count {
            let tradeable = if is_buy {
                prices[i] <= limit_price
            } else {
                prices[i] >= limit_price
            };
            if !tradeable {
                break;
            }
            matched += 1;
            i += 1;
        }

        matched
    }

    /// # Safety
    /// Caller must ensure the CPU supports AVX2.
    #[target_feature(enable = "avx2")]
    pub unsafe fn find_first_matchable_level(
        prices: &[i64],
        limit_price: i64,
        is_buy: bool,
    ) -> Option<usize> {
        let count = prices.len();
        let broadcast = _mm256_set1_epi64x(limit_price);
        let mut i = 0;

        while i + LANE_COUNT <= count {
            let lane = _mm256_loadu_si256(prices.as_ptr().add(i).cast());
            let miss = if is_buy {
                _mm256_cmpgt_epi64(lane, broadcast)
            } else {
                _mm256_cmpgt_epi64(broadcast, lane)
            };
            let hit_mask = !movemask(miss) & LANE_MASK;
            if hit_mask != 0 {
                return Some(i + hit_mask.trailing_zeros() as usize);
            }
            i += LANE_COUNT;
        }

        while i < count {
            let tradeable = if is_buy {
                prices[i] <= limit_price
            } else {
                prices[i] >= limit_price
            };
            if tradeable {
                return Some(i);
            }
            i += 1;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanners() -> Vec<PriceScanner> {
        let mut all = vec![PriceScanner::Scalar];
        #[cfg(target_arch = "x86_64")]
        if is_x86_feature_detected!("avx2") {
            all.push(PriceScanner::Vectorized);
        }
        all
    }

    #[test]
    fn test_insertion_point_descending() {
        // Bid side: descending
        let prices = [105, 103, 100, 98];
        for scanner in scanners() {
            assert_eq!(scanner.find_insertion_point(&prices, 110, true), 0);
            assert_eq!(scanner.find_insertion_point(&prices, 104, true), 1);
            assert_eq!(scanner.find_insertion_point(&prices, 99, true), 3);
            assert_eq!(scanner.find_insertion_point(&prices, 90, true), 4);
            // Equal price does not satisfy the strict comparison
            assert_eq!(scanner.find_insertion_point(&prices, 103, true), 2);
        }
    }

    #[test]
    fn test_insertion_point_ascending() {
        // Ask side: ascending
        let prices = [100, 101, 103, 110];
        for scanner in scanners() {
            assert_eq!(scanner.find_insertion_point(&prices, 99, false), 0);
            assert_eq!(scanner.find_insertion_point(&prices, 102, false), 2);
            assert_eq!(scanner.find_insertion_point(&prices, 120, false), 4);
            assert_eq!(scanner.find_insertion_point(&prices, 101, false), 2);
        }
    }

    #[test]
    fn test_count_matchable_buy_sweeps_asks() {
        let asks = [100, 101, 102, 105, 110];
        for scanner in scanners() {
            assert_eq!(scanner.count_matchable_levels(&asks, 102, true), 3);
            assert_eq!(scanner.count_matchable_levels(&asks, 99, true), 0);
            assert_eq!(scanner.count_matchable_levels(&asks, 110, true), 5);
            assert_eq!(scanner.count_matchable_levels(&asks, i64::MAX, true), 5);
        }
    }

    #[test]
    fn test_count_matchable_sell_sweeps_bids() {
        let bids = [110, 105, 102, 101, 100];
        for scanner in scanners() {
            assert_eq!(scanner.count_matchable_levels(&bids, 102, false), 3);
            assert_eq!(scanner.count_matchable_levels(&bids, 111, false), 0);
            assert_eq!(scanner.count_matchable_levels(&bids, i64::MIN, false), 5);
        }
    }

    #[test]
    fn test_first_matchable_level() {
        let asks = [100, 101, 102];
        for scanner in scanners() {
            assert_eq!(scanner.find_first_matchable_level(&asks, 100, true), Some(0));
            assert_eq!(scanner.find_first_matchable_level(&asks, 99, true), None);
            assert_eq!(scanner.find_first_matchable_level(&[], 100, true), None);
        }
    }

    #[test]
    fn test_empty_array() {
        for scanner in scanners() {
            assert_eq!(scanner.find_insertion_point(&[], 100, true), 0);
            assert_eq!(scanner.count_matchable_levels(&[], 100, true), 0);
        }
    }

    #[test]
    fn test_tail_lengths_cross_lane_boundaries() {
        // Lengths straddling the 4-lane register width exercise the scalar tail
        for len in 0..=9usize {
            let asks: Vec<i64> = (0..len as i64).map(|i| 100 + i).collect();
            for scanner in scanners() {
                assert_eq!(
                    scanner.count_matchable_levels(&asks, 103, true),
                    asks.iter().take_while(|&&p| p <= 103).count()
                );
                assert_eq!(
                    scanner.find_insertion_point(&asks, 103, false),
                    asks.iter().take_while(|&&p| p <= 103).count()
                );
            }
        }
    }
}

//! Page-number pagination over id-ordered result sets.
//!
//! Pages are 1-based. The first page always exists, even over an empty
//! result set; every other page must hold at least one item.

use std::num::NonZeroU32;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: NonZeroU32 = match NonZeroU32::new(10) {
    Some(size) => size,
    None => unreachable!(),
};

/// Query value that selects the last page.
const LAST_PAGE: &str = "last";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid page.")]
pub struct InvalidPage;

/// A requested page, before it is checked against the size of the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    Number(u64),
    Last,
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::Number(1)
    }
}

impl PageNumber {
    /// Parses the raw `page` query parameter. An absent parameter means the first page.
    pub fn parse(raw: Option<&str>) -> Result<Self, InvalidPage> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        if raw == LAST_PAGE {
            return Ok(Self::Last);
        }
        match raw.parse::<u64>() {
            Ok(number) if number > 0 => Ok(Self::Number(number)),
            _ => Err(InvalidPage),
        }
    }
}

/// The slice of a result set that backs one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    number: u64,
    num_pages: u64,
    count: u64,
    offset: u64,
    limit: u64,
}

impl PageWindow {
    pub const fn number(&self) -> u64 {
        self.number
    }

    pub const fn offset(&self) -> u64 {
        self.offset
    }

    pub const fn limit(&self) -> u64 {
        self.limit
    }

    pub const fn next(&self) -> Option<u64> {
        if self.number < self.num_pages {
            Some(self.number + 1)
        } else {
            None
        }
    }

    pub const fn previous(&self) -> Option<u64> {
        if self.number > 1 {
            Some(self.number - 1)
        } else {
            None
        }
    }

    pub fn into_page<T>(self, results: Vec<T>) -> Page<T> {
        Page {
            count: self.count,
            next: self.next(),
            previous: self.previous(),
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    count: u64,
    next: Option<u64>,
    previous: Option<u64>,
    results: Vec<T>,
}

impl<T> Page<T> {
    /// Total number of items across all pages.
    pub const fn count(&self) -> u64 {
        self.count
    }

    pub const fn next(&self) -> Option<u64> {
        self.next
    }

    pub const fn previous(&self) -> Option<u64> {
        self.previous
    }

    pub fn into_results(self) -> Vec<T> {
        self.results
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: NonZeroU32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    pub const fn new(page_size: NonZeroU32) -> Self {
        Self { page_size }
    }

    pub fn num_pages(&self, count: u64) -> u64 {
        if count == 0 {
            1
        } else {
            count.div_ceil(u64::from(self.page_size.get()))
        }
    }

    /// Resolves `number` against a result set of `count` items.
    pub fn window(&self, number: PageNumber, count: u64) -> Result<PageWindow, InvalidPage> {
        let num_pages = self.num_pages(count);
        let number = match number {
            PageNumber::Number(number) if (1..=num_pages).contains(&number) => number,
            PageNumber::Number(_) => return Err(InvalidPage),
            PageNumber::Last => num_pages,
        };
        let limit = u64::from(self.page_size.get());
        Ok(PageWindow {
            number,
            num_pages,
            count,
            offset: (number - 1) * limit,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginator(size: u32) -> Paginator {
        Paginator::new(NonZeroU32::new(size).unwrap())
    }

    /// Applies a window the way the store's `LIMIT`/`OFFSET` does.
    fn page_of(
        paginator: &Paginator,
        items: &[u32],
        number: PageNumber,
    ) -> Result<Page<u32>, InvalidPage> {
        let window = paginator.window(number, items.len() as u64)?;
        let results = items
            .iter()
            .skip(window.offset() as usize)
            .take(window.limit() as usize)
            .copied()
            .collect();
        Ok(window.into_page(results))
    }

    #[test]
    fn parses_page_parameter() {
        assert_eq!(PageNumber::parse(None), Ok(PageNumber::Number(1)));
        assert_eq!(PageNumber::parse(Some("6")), Ok(PageNumber::Number(6)));
        assert_eq!(PageNumber::parse(Some("last")), Ok(PageNumber::Last));
        for raw in ["0", "-1", "", "2.5", "two", " 3"] {
            assert_eq!(PageNumber::parse(Some(raw)), Err(InvalidPage), "{raw:?}");
        }
    }

    #[test]
    fn window_offsets_follow_page_number() {
        let paginator = paginator(10);

        let first = paginator.window(PageNumber::Number(1), 53).unwrap();
        assert_eq!((first.number(), first.offset(), first.limit()), (1, 0, 10));
        assert_eq!(first.previous(), None);
        assert_eq!(first.next(), Some(2));

        let last = paginator.window(PageNumber::Number(6), 53).unwrap();
        assert_eq!((last.number(), last.offset(), last.limit()), (6, 50, 10));
        assert_eq!(last.previous(), Some(5));
        assert_eq!(last.next(), None);

        assert_eq!(paginator.window(PageNumber::Last, 53), Ok(last));
        assert_eq!(paginator.window(PageNumber::Number(7), 53), Err(InvalidPage));
        assert_eq!(paginator.window(PageNumber::Number(1000), 53), Err(InvalidPage));
        assert_eq!(paginator.window(PageNumber::Number(0), 53), Err(InvalidPage));
    }

    #[test]
    fn fifty_three_items_split_into_six_pages() {
        let items: Vec<u32> = (0..53).collect();
        let paginator = paginator(10);

        let sizes: Vec<usize> = (1..=6)
            .map(|n| {
                page_of(&paginator, &items, PageNumber::Number(n))
                    .unwrap()
                    .into_results()
                    .len()
            })
            .collect();
        assert_eq!(sizes, [10, 10, 10, 10, 10, 3]);

        let last = page_of(&paginator, &items, PageNumber::Number(6)).unwrap();
        assert_eq!(last.count(), 53);
        assert_eq!(last.into_results(), [50, 51, 52]);
    }

    #[test]
    fn first_page_of_empty_result_set_is_valid() {
        let paginator = paginator(10);
        let window = paginator.window(PageNumber::default(), 0).unwrap();
        assert_eq!(window.offset(), 0);
        assert_eq!(window.next(), None);
        assert_eq!(window.previous(), None);

        let page = window.into_page(Vec::<u32>::new());
        assert_eq!(page.count(), 0);
        assert!(page.into_results().is_empty());

        assert_eq!(paginator.window(PageNumber::Number(2), 0), Err(InvalidPage));
        assert_eq!(paginator.window(PageNumber::Last, 0).map(|w| w.number()), Ok(1));
    }

    #[test]
    fn last_resolves_to_final_page() {
        let window = paginator(10).window(PageNumber::Last, 25).unwrap();
        assert_eq!(window.number(), 3);
        assert_eq!(window.offset(), 20);
    }

    #[test]
    fn page_count_and_sizes_hold_for_all_lengths() {
        for size in 1..=12u32 {
            let paginator = paginator(size);
            for len in 0..=60u32 {
                let items: Vec<u32> = (0..len).collect();
                let num_pages = paginator.num_pages(u64::from(len));
                let expected = if len == 0 { 1 } else { len.div_ceil(size) };
                assert_eq!(num_pages, u64::from(expected));

                let mut seen = Vec::new();
                for n in 1..=num_pages {
                    let page = page_of(&paginator, &items, PageNumber::Number(n)).unwrap();
                    assert_eq!(page.next(), (n < num_pages).then_some(n + 1));
                    assert_eq!(page.previous(), n.checked_sub(1).filter(|p| *p > 0));

                    let results = page.into_results();
                    if n < num_pages {
                        assert_eq!(results.len(), size as usize);
                    } else {
                        assert!(results.len() <= size as usize);
                    }
                    seen.extend(results);
                }
                assert_eq!(seen, items);
                assert_eq!(
                    paginator.window(PageNumber::Number(num_pages + 1), u64::from(len)),
                    Err(InvalidPage)
                );
            }
        }
    }
}

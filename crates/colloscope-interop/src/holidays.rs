#![forbid(unsafe_code)]

//! Caching layer over the external holiday data source.
//!
//! Holiday data moves slowly — ministries publish a school year at a
//! time — so results are cached per academy with a six-month freshness
//! window. [`CachedHolidaySource`] wraps any [`HolidayService`]
//! transport and implements the same trait, so the session's refresh
//! takes either interchangeably.
//!
//! Single-threaded by design, like the rest of the core: the cache uses
//! interior mutability, not locks, and no borrow is held across an
//! await.

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::{DateTime, Months, NaiveDate, Utc};

use colloscope_model::{HolidayService, Interval};

/// How long a cached answer stays valid, in months.
const FRESHNESS_MONTHS: u32 = 6;

#[derive(Debug, Clone)]
struct Stamped<T> {
    fetched_at: DateTime<Utc>,
    data: T,
}

impl<T: Clone> Stamped<T> {
    fn now(data: T) -> Self {
        Self {
            fetched_at: Utc::now(),
            data,
        }
    }

    fn fresh(&self) -> Option<T> {
        let deadline = self
            .fetched_at
            .checked_add_months(Months::new(FRESHNESS_MONTHS))?;
        (Utc::now() < deadline).then(|| self.data.clone())
    }
}

/// Per-academy cache in front of a [`HolidayService`] transport.
#[derive(Debug)]
pub struct CachedHolidaySource<S> {
    inner: S,
    academies: RefCell<Option<Stamped<Vec<String>>>>,
    school: RefCell<HashMap<String, Stamped<Vec<Interval>>>>,
    public: RefCell<HashMap<String, Stamped<Vec<NaiveDate>>>>,
}

impl<S> CachedHolidaySource<S> {
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            academies: RefCell::new(None),
            school: RefCell::new(HashMap::new()),
            public: RefCell::new(HashMap::new()),
        }
    }

    /// Drop every cached answer.
    pub fn invalidate(&self) {
        *self.academies.borrow_mut() = None;
        self.school.borrow_mut().clear();
        self.public.borrow_mut().clear();
    }
}

impl<S: HolidayService> HolidayService for CachedHolidaySource<S> {
    type Error = S::Error;

    async fn academies(&self) -> Result<Vec<String>, Self::Error> {
        let cached = self
            .academies
            .borrow()
            .as_ref()
            .and_then(Stamped::fresh);
        if let Some(data) = cached {
            tracing::trace!("academies served from cache");
            return Ok(data);
        }
        let data = self.inner.academies().await?;
        *self.academies.borrow_mut() = Some(Stamped::now(data.clone()));
        Ok(data)
    }

    async fn school_holidays(&self, academy: &str) -> Result<Vec<Interval>, Self::Error> {
        let cached = self
            .school
            .borrow()
            .get(academy)
            .and_then(Stamped::fresh);
        if let Some(data) = cached {
            tracing::trace!(academy, "school holidays served from cache");
            return Ok(data);
        }
        let data = self.inner.school_holidays(academy).await?;
        self.school
            .borrow_mut()
            .insert(academy.to_string(), Stamped::now(data.clone()));
        Ok(data)
    }

    async fn public_holidays(&self, academy: &str) -> Result<Vec<NaiveDate>, Self::Error> {
        let cached = self
            .public
            .borrow()
            .get(academy)
            .and_then(Stamped::fresh);
        if let Some(data) = cached {
            tracing::trace!(academy, "public holidays served from cache");
            return Ok(data);
        }
        let data = self.inner.public_holidays(academy).await?;
        self.public
            .borrow_mut()
            .insert(academy.to_string(), Stamped::now(data.clone()));
        Ok(data)
    }
}

// ============================================================================
// Tests
// ============================================================================

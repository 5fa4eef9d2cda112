use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::error::AppError;

pub trait Validate {
    const KIND: &'static str;

    fn validate(&self) -> Result<(), AppError>;
}

/// Holds the current settings as an immutable snapshot.
///
/// Readers take an `Arc` clone and compute against it, so an update published while
/// a calculation is running never changes the values that calculation sees. Writers
/// validate first and swap the whole snapshot; a rejected update leaves the previous
/// snapshot in place.
pub struct SettingsStore<T> {
    current: RwLock<Arc<T>>,
}

impl<T> SettingsStore<T>
where
    T: Validate + Clone,
{
    pub fn new(initial: T) -> Result<Self, AppError> {
        initial.validate()?;
        Ok(Self {
            current: RwLock::new(Arc::new(initial)),
        })
    }

    pub fn snapshot(&self) -> Arc<T> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn replace(&self, next: T) -> Result<Arc<T>, AppError> {
        if let Err(err) = next.validate() {
            warn!(kind = T::KIND, error = %err, "settings update rejected");
            return Err(err);
        }

        let next = Arc::new(next);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::clone(&next);
        drop(guard);

        info!(kind = T::KIND, "settings updated");
        Ok(next)
    }

    // Write lock held across the derivation so concurrent patches serialize.
    pub fn update<F>(&self, apply: F) -> Result<Arc<T>, AppError>
    where
        F: FnOnce(&T) -> T,
    {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let candidate = apply(&**guard);
        if let Err(err) = candidate.validate() {
            warn!(kind = T::KIND, error = %err, "settings update rejected");
            return Err(err);
        }

        let next = Arc::new(candidate);
        *guard = Arc::clone(&next);
        drop(guard);

        info!(kind = T::KIND, "settings updated");
        Ok(next)
    }
}

pub(crate) fn ensure_non_negative(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Configuration(format!(
            "{field} must be a finite value >= 0, got {value}"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_percentage(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(AppError::Configuration(format!(
            "{field} must be within [0, 100], got {value}"
        )));
    }
    Ok(())
}

//! Per-session state: settings in use, transient objects, current result,
//! and the busy flag.
//!
//! The dispatcher is the only writer of the current result; presenters get
//! shared references.

use crate::image::{GenerationResult, ImageFormat, ImageRef, ObjectHandle, ProviderId};
use crate::settings::ProviderConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Image bytes held under a transient handle.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Encoded image.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
}

/// Transient, revocable in-memory images.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: HashMap<ObjectHandle, StoredObject>,
}

impl ObjectStore {
    /// Stores bytes and returns a fresh handle.
    pub fn insert(&mut self, data: Vec<u8>, format: ImageFormat) -> ObjectHandle {
        let handle = ObjectHandle::generate();
        self.objects
            .insert(handle.clone(), StoredObject { data, format });
        handle
    }

    /// Resolves a handle.
    pub fn get(&self, handle: &ObjectHandle) -> Option<&StoredObject> {
        self.objects.get(handle)
    }

    /// Releases a handle. Returns false if it was already gone.
    pub fn revoke(&mut self, handle: &ObjectHandle) -> bool {
        self.objects.remove(handle).is_some()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Gate allowing one generation at a time.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    /// Returns true while a generation is running.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Sets the flag, or returns `None` if it is already set.
    /// The flag clears when the guard drops.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(self.0.clone()))
    }
}

/// Clears the busy flag on drop.
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Everything a generation reads or writes.
#[derive(Debug, Default)]
pub struct SessionContext {
    /// Provider settings in effect.
    pub config: ProviderConfig,
    /// Bare Pollinations key; enables the paid endpoint.
    pub pollinations_key: Option<String>,
    objects: ObjectStore,
    current: Option<GenerationResult>,
    busy: BusyFlag,
}

impl SessionContext {
    /// Creates a context from loaded settings.
    pub fn new(config: ProviderConfig, pollinations_key: Option<String>) -> Self {
        Self {
            config,
            pollinations_key,
            ..Default::default()
        }
    }

    /// Returns the key to use for a provider.
    pub fn credentials(&self, provider: ProviderId) -> Option<&str> {
        match provider {
            ProviderId::Pollinations => self
                .pollinations_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty()),
            paid => self.config.key_for(paid),
        }
    }

    /// The latest successful result.
    pub fn current(&self) -> Option<&GenerationResult> {
        self.current.as_ref()
    }

    /// Transient objects owned by this session.
    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub(crate) fn objects_mut(&mut self) -> &mut ObjectStore {
        &mut self.objects
    }

    /// The busy flag.
    pub fn busy(&self) -> &BusyFlag {
        &self.busy
    }

    /// Returns true while a generation is running.
    pub fn is_busy(&self) -> bool {
        self.busy.is_set()
    }

    /// Makes `result` current, revoking the superseded transient object.
    pub(crate) fn supersede(&mut self, result: GenerationResult) -> &GenerationResult {
        if let Some(ImageRef::Object(old)) = self.current.take().map(|r| r.image_ref) {
            if self.objects.revoke(&old) {
                tracing::debug!(handle = %old, "revoked superseded image");
            }
        }
        self.current.insert(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(image_ref: ImageRef) -> GenerationResult {
        GenerationResult {
            image_ref,
            provider_label: "Pollinations.ai".into(),
            model_label: "Flux (High Quality)".into(),
            size_label: "512 × 512".into(),
            timestamp: "12:00:00 PM".into(),
        }
    }

    #[test]
    fn test_busy_guard_clears_on_drop() {
        let flag = BusyFlag::default();
        {
            let _guard = flag.try_acquire().unwrap();
            assert!(flag.is_set());
            assert!(flag.try_acquire().is_none());
        }
        assert!(!flag.is_set());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn test_supersede_revokes_previous_object() {
        let mut ctx = SessionContext::default();
        let first = ctx.objects_mut().insert(vec![1, 2, 3], ImageFormat::Png);
        ctx.supersede(result(ImageRef::Object(first.clone())));
        assert_eq!(ctx.objects().len(), 1);

        let second = ctx.objects_mut().insert(vec![4, 5, 6], ImageFormat::Png);
        ctx.supersede(result(ImageRef::Object(second.clone())));

        assert!(ctx.objects().get(&first).is_none());
        assert!(ctx.objects().get(&second).is_some());
        assert_eq!(ctx.objects().len(), 1);

        ctx.supersede(result(ImageRef::Url("https://example.com/a.png".into())));
        assert!(ctx.objects().is_empty());
        assert_eq!(
            ctx.current().unwrap().image_ref.as_uri(),
            "https://example.com/a.png"
        );
    }

    #[test]
    fn test_credentials() {
        let mut config = ProviderConfig::default();
        config.set_key(ProviderId::OpenAi, "sk-oa");
        let ctx = SessionContext::new(config, Some("  ".into()));

        assert_eq!(ctx.credentials(ProviderId::Pollinations), None);
        assert_eq!(ctx.credentials(ProviderId::OpenAi), Some("sk-oa"));
        assert_eq!(ctx.credentials(ProviderId::Together), None);

        let ctx = SessionContext::new(ProviderConfig::default(), Some("pk".into()));
        assert_eq!(ctx.credentials(ProviderId::Pollinations), Some("pk"));
    }
}

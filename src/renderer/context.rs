//! WGPU Context
//!
//! [`RenderContext`] owns the device, queue, surface, and surface
//! configuration, and carries the device-lost latch. Acquisition is the
//! engine's only asynchronous operation and happens at startup; everything
//! per-frame is synchronous.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::{ArborError, Result};

type LostObserver = Box<dyn Fn(&ArborError) + Send + Sync>;

/// Latch for the asynchronous device-lost signal.
///
/// `notify` flips the latch and hands every registered observer an
/// [`ArborError::DeviceLost`] exactly once per loss; repeated
/// notifications while already lost are ignored. The owner resets the
/// latch when a fresh device is installed.
#[derive(Default)]
pub struct LostSignal {
    lost: AtomicBool,
    observers: Mutex<Vec<LostObserver>>,
}

impl LostSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    /// Registers an observer for future losses. Observers receive the
    /// [`ArborError::DeviceLost`] built from the backend's notification.
    pub fn observe(&self, observer: impl Fn(&ArborError) + Send + Sync + 'static) {
        self.observers.lock().push(Box::new(observer));
    }

    /// Raises the latch and notifies observers. Returns `false` when the
    /// latch was already raised (observers are not re-notified).
    pub fn notify(&self, reason: &str, message: &str) -> bool {
        if self.lost.swap(true, Ordering::AcqRel) {
            return false;
        }
        let error = ArborError::DeviceLost {
            reason: reason.to_string(),
            message: message.to_string(),
        };
        log::warn!("{error}");
        for observer in self.observers.lock().iter() {
            observer(&error);
        }
        true
    }

    /// Lowers the latch after a new device has been installed.
    pub fn reset(&self) {
        self.lost.store(false, Ordering::Release);
    }
}

/// Device, queue, surface, and configuration for one presentation target.
pub struct RenderContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    lost: LostSignal,
}

impl RenderContext {
    /// Acquires an adapter and device for the given surface target and
    /// configures the surface with the preferred format and pre-multiplied
    /// alpha (falling back to the surface's default alpha mode when
    /// unsupported).
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(target)
            .map_err(|e| ArborError::AdapterRequestFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ArborError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        let mut config = surface
            .get_default_config(&adapter, width.max(1), height.max(1))
            .ok_or_else(|| {
                ArborError::AdapterRequestFailed("Surface not supported by adapter".to_string())
            })?;

        let capabilities = surface.get_capabilities(&adapter);
        if capabilities
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            config.alpha_mode = wgpu::CompositeAlphaMode::PreMultiplied;
        }
        surface.configure(&device, &config);

        Ok(Self {
            device,
            queue,
            surface,
            config,
            lost: LostSignal::new(),
        })
    }

    /// Reconfigures the surface. Zero dimensions are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// The negotiated surface colour format.
    #[must_use]
    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    #[must_use]
    pub fn is_lost(&self) -> bool {
        self.lost.is_lost()
    }

    /// Registers an observer for device-lost notifications; observers
    /// receive the typed [`ArborError::DeviceLost`].
    pub fn on_device_lost(&self, observer: impl Fn(&ArborError) + Send + Sync + 'static) {
        self.lost.observe(observer);
    }

    /// Entry point for the backend's `device.lost` notification.
    pub fn notify_lost(&self, reason: &str, message: &str) {
        self.lost.notify(reason, message);
    }

    /// Lowers the lost latch; callers clear pipeline caches and GPU
    /// buffers separately so they rebuild lazily.
    pub fn reset_lost(&self) {
        self.lost.reset();
    }
}

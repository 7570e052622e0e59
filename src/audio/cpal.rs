// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{error, info, span, Level};

use crate::audio::mixer::{ActiveSource, AudioMixer};
use crate::{audio::Device as AudioDevice, config};

/// The device name that selects the host's default output.
const DEFAULT_DEVICE: &str = "default";

/// A small wrapper around a cpal::Device. Owns the mixer that voices feed and
/// the thread that keeps the output stream alive.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The core audio mixer.
    mixer: AudioMixer,
    /// Channel for adding sources without taking the mixer lock on the caller's thread.
    source_tx: crossbeam_channel::Sender<ActiveSource>,
    /// Receiver drained by the audio callback.
    source_rx: crossbeam_channel::Receiver<ActiveSource>,
    /// Cleared to stop the output thread.
    running: Arc<AtomicBool>,
    /// Handle to the output thread (keeps the stream alive).
    output_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// Builds a callback that drains new sources and mixes straight into the cpal buffer.
fn create_callback<T>(
    mixer: AudioMixer,
    source_rx: crossbeam_channel::Receiver<ActiveSource>,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = mixer.num_channels() as usize;
    let mut scratch: Vec<f32> = Vec::new();
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        while let Ok(source) = source_rx.try_recv() {
            mixer.add_source(source);
        }

        scratch.resize(data.len(), 0.0);
        mixer.process_into_output(&mut scratch, data.len() / channels);

        for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
            *dst = T::from_sample(src.clamp(-1.0, 1.0));
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    mixer: AudioMixer,
    source_rx: crossbeam_channel::Receiver<ActiveSource>,
) -> Result<cpal::Stream, Box<dyn Error>> {
    let config = cpal::StreamConfig {
        channels: mixer.num_channels(),
        sample_rate: cpal::SampleRate(mixer.sample_rate()),
        buffer_size: cpal::BufferSize::Default,
    };
    let err_fn = |err| error!("CPAL output stream error: {}", err);

    let stream = match device.default_output_config()?.sample_format() {
        cpal::SampleFormat::F32 => device.build_output_stream(
            &config,
            create_callback::<f32>(mixer, source_rx),
            err_fn,
            None,
        )?,
        cpal::SampleFormat::I16 => device.build_output_stream(
            &config,
            create_callback::<i16>(mixer, source_rx),
            err_fn,
            None,
        )?,
        cpal::SampleFormat::I32 => device.build_output_stream(
            &config,
            create_callback::<i32>(mixer, source_rx),
            err_fn,
            None,
        )?,
        cpal::SampleFormat::U16 => device.build_output_stream(
            &config,
            create_callback::<u16>(mixer, source_rx),
            err_fn,
            None,
        )?,
        other => return Err(format!("unsupported sample format {}", other).into()),
    };

    Ok(stream)
}

impl Device {
    fn new(
        name: String,
        host_id: cpal::HostId,
        device: cpal::Device,
        max_channels: u16,
        channels: u16,
        sample_rate: u32,
    ) -> Device {
        let (source_tx, source_rx) = crossbeam_channel::unbounded();
        Device {
            name,
            max_channels,
            host_id,
            device,
            mixer: AudioMixer::new(channels, sample_rate),
            source_tx,
            source_rx,
            running: Arc::new(AtomicBool::new(false)),
            output_thread: Mutex::new(None),
        }
    }

    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let max_channels = match device.supported_output_configs() {
                    Ok(configs) => configs.map(|c| c.channels()).max().unwrap_or(0),
                    Err(_) => continue,
                };

                if max_channels > 0 {
                    devices.push(Device::new(
                        device.name()?,
                        host_id,
                        device,
                        max_channels,
                        max_channels,
                        config::DEFAULT_SAMPLE_RATE,
                    ));
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the cpal device named in the config, or the host default for "default".
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device();

        let (name, host_id, device, max_channels) = if name == DEFAULT_DEVICE {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no default output device")?;
            let max_channels = device
                .supported_output_configs()?
                .map(|c| c.channels())
                .max()
                .unwrap_or(0);
            (device.name()?, host.id(), device, max_channels)
        } else {
            match Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
            {
                Some(found) => (found.name.clone(), found.host_id, found.device.clone(), found.max_channels),
                None => return Err(format!("no device found with name {}", name).into()),
            }
        };

        if max_channels < config.channels() {
            return Err(format!(
                "{} channels requested, audio device {} only has {}",
                config.channels(),
                name,
                max_channels
            )
            .into());
        }

        Ok(Device::new(
            name,
            host_id,
            device,
            max_channels,
            config.channels(),
            config.sample_rate(),
        ))
    }
}

impl AudioDevice for Device {
    fn start(&self) -> Result<(), Box<dyn Error>> {
        let mut output_thread = self.output_thread.lock();
        if output_thread.is_some() {
            return Ok(());
        }

        let span = span!(Level::INFO, "start output (cpal)");
        let _enter = span.enter();

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let device = self.device.clone();
        let mixer = self.mixer.clone();
        let source_rx = self.source_rx.clone();
        let running = self.running.clone();
        running.store(true, Ordering::Relaxed);

        // The stream is created inside the thread that keeps it alive.
        let handle = thread::spawn(move || {
            let stream = match build_stream(&device, mixer, source_rx) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            while running.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(100));
            }
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!(
                    device = self.name,
                    channels = self.mixer.num_channels(),
                    sample_rate = self.mixer.sample_rate(),
                    "CPAL output stream started successfully"
                );
                *output_thread = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::Relaxed);
                let _ = handle.join();
                Err(format!("failed to start output on {}: {}", self.name, e).into())
            }
            Err(_) => {
                self.running.store(false, Ordering::Relaxed);
                Err("output thread exited before starting".into())
            }
        }
    }

    fn add_source(&self, source: ActiveSource) -> Result<(), Box<dyn Error>> {
        self.source_tx.send(source)?;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<super::mock::Device>, Box<dyn Error>> {
        Err("not a mock".into())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        self.mixer.clear();
        if let Some(thread) = self.output_thread.lock().take() {
            let _ = thread.join();
        }
    }
}

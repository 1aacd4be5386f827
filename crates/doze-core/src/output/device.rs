//! CPAL output sink.

use super::{AudioSink, SinkFormat, SinkHandle};
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::time::Duration;

/// Sleep between attempts when the ring is full.
const FULL_RING_POLL: Duration = Duration::from_millis(2);

/// Wrapper to hold `cpal::Stream` in a `Send` context.
///
/// # Safety
/// `cpal::Stream` is `!Send` due to platform internals. The stream is never
/// touched after `play()`; it is only kept alive and dropped by whichever
/// thread owns the sink.
struct StreamHandle(#[allow(dead_code)] cpal::Stream);

unsafe impl Send for StreamHandle {}

/// Streams i16 frames to an output device through an SPSC ring.
///
/// `write` pushes into the ring from the playback thread; the cpal callback
/// drains it and converts to the device sample type. An underrun plays
/// silence.
pub struct CpalSink {
    format: SinkFormat,
    producer: HeapProd<i16>,
    handle: SinkHandle,
    _stream: StreamHandle,
}

impl CpalSink {
    /// Open and start the device. `ring_frames` sets the ring capacity.
    pub fn open(device_index: Option<usize>, ring_frames: usize) -> Result<Self> {
        let device = get_device(device_index)?;
        let config = device.default_output_config()?;
        let format = SinkFormat::new(config.sample_rate().0, config.channels());

        let capacity = ring_frames.max(1) * format.channels.max(1) as usize;
        let (producer, consumer) = HeapRb::<i16>::new(capacity).split();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), consumer)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), consumer)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), consumer)?,
            format => {
                return Err(Error::InvalidConfig(format!(
                    "Unsupported sample format: {format:?}"
                )));
            }
        };

        stream.play()?;

        tracing::info!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            "output device started"
        );

        Ok(Self {
            format,
            producer,
            handle: SinkHandle::new(),
            _stream: StreamHandle(stream),
        })
    }

    pub fn list_devices() -> Result<Vec<String>> {
        cpal::default_host()
            .output_devices()?
            .enumerate()
            .map(|(i, d)| Ok(format!("{i}: {}", d.name()?)))
            .collect()
    }
}

impl AudioSink for CpalSink {
    fn format(&self) -> SinkFormat {
        self.format
    }

    fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    fn write(&mut self, samples: &[i16]) -> isize {
        let mut written = 0;
        while written < samples.len() {
            if self.handle.is_closed() {
                break;
            }
            let pushed = self.producer.push_slice(&samples[written..]);
            written += pushed;
            if pushed == 0 {
                std::thread::sleep(FULL_RING_POLL);
            }
        }

        if written == 0 && !samples.is_empty() {
            -1
        } else {
            written as isize
        }
    }
}

fn get_device(index: Option<usize>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    match index {
        Some(i) => {
            let devices: Vec<_> = host.output_devices()?.collect();
            let count = devices.len();
            devices.into_iter().nth(i).ok_or_else(|| {
                Error::InvalidDevice(format!("Device index {i} out of range ({count} available)"))
            })
        }
        None => host
            .default_output_device()
            .ok_or_else(|| Error::InvalidDevice("No output device available".into())),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut consumer: HeapCons<i16>,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    // Grows on the first callback, then stable
    let mut scratch = Vec::<i16>::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                if scratch.len() < data.len() {
                    scratch.resize(data.len(), 0);
                }
                let available = consumer.occupied_len().min(data.len());
                let popped = consumer.pop_slice(&mut scratch[..available]);

                for (out, &s) in data.iter_mut().zip(&scratch[..popped]) {
                    *out = T::from_sample(s);
                }
                output_silence(&mut data[popped..]);
            }));

            if result.is_err() {
                output_silence(data);
            }
        },
        |err| tracing::warn!(%err, "output stream error"),
        None,
    )?;

    Ok(stream)
}

#[inline]
fn output_silence<T: cpal::SizedSample + cpal::FromSample<i16>>(data: &mut [T]) {
    for sample in data.iter_mut() {
        *sample = T::from_sample(0i16);
    }
}

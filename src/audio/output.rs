//! Audio output using cpal

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{AudioSink, PcmBuffer};
use crate::error::{Result, SequencerError};

/// Keeps the device stream alive. Drop it to close the output.
pub struct AudioOutput {
    _stream: cpal::Stream,
    sender: VoiceSender,
    sample_rate: u32,
    channels: u16,
}

impl AudioOutput {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SequencerError::Audio("no default output device".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| SequencerError::Audio(e.to_string()))?;

        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels;

        let (tx, rx) = unbounded();
        let mixer = VoiceMixer::new(rx, sample_rate, channels as usize);

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer)?,
            other => {
                return Err(SequencerError::Audio(format!(
                    "unsupported sample format {:?}",
                    other
                )))
            }
        };
        stream
            .play()
            .map_err(|e| SequencerError::Audio(e.to_string()))?;

        log::info!("Audio output: {} Hz, {} channels", sample_rate, channels);

        Ok(Self {
            _stream: stream,
            sender: VoiceSender { tx },
            sample_rate,
            channels,
        })
    }

    /// A thread-safe handle for queueing notes on this output.
    pub fn sink(&self) -> VoiceSender {
        self.sender.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

#[derive(Debug, Clone)]
pub struct VoiceSender {
    tx: Sender<PcmBuffer>,
}

impl AudioSink for VoiceSender {
    fn play(&self, buffer: PcmBuffer) -> Result<()> {
        self.tx
            .send(buffer)
            .map_err(|_| SequencerError::Audio("audio output has been closed".into()))
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: VoiceMixer,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| mixer.fill(data),
            |err| log::error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| SequencerError::Audio(e.to_string()))
}

/// One note being played back, resampled to the device rate.
struct Voice {
    buffer: PcmBuffer,
    position: f64,
    increment: f64,
}

impl Voice {
    fn new(buffer: PcmBuffer, device_rate: u32) -> Self {
        let increment = buffer.sample_rate() as f64 / device_rate.max(1) as f64;
        Self {
            buffer,
            position: 0.0,
            increment,
        }
    }

    fn next_frame(&mut self) -> Option<[f32; 2]> {
        let frames = self.buffer.frames();
        let index = self.position as usize;
        let current = *frames.get(index)?;
        let next = frames.get(index + 1).copied().unwrap_or(current);
        let frac = (self.position - index as f64) as f32;

        let lerp = |a: i16, b: i16| (a as f32 + (b as f32 - a as f32) * frac) / 32768.0;
        self.position += self.increment;
        Some([lerp(current[0], next[0]), lerp(current[1], next[1])])
    }
}

/// Lives inside the device callback; sums whichever voices are still sounding.
struct VoiceMixer {
    incoming: Receiver<PcmBuffer>,
    voices: Vec<Voice>,
    device_rate: u32,
    channels: usize,
}

impl VoiceMixer {
    fn new(incoming: Receiver<PcmBuffer>, device_rate: u32, channels: usize) -> Self {
        Self {
            incoming,
            voices: Vec::with_capacity(32),
            device_rate,
            channels: channels.max(1),
        }
    }

    fn fill<T>(&mut self, data: &mut [T])
    where
        T: SizedSample + FromSample<f32>,
    {
        while let Ok(buffer) = self.incoming.try_recv() {
            self.voices.push(Voice::new(buffer, self.device_rate));
        }

        for frame in data.chunks_mut(self.channels) {
            let mut mixed = [0.0f32; 2];
            self.voices.retain_mut(|voice| match voice.next_frame() {
                Some([left, right]) => {
                    mixed[0] += left;
                    mixed[1] += right;
                    true
                }
                None => false,
            });

            let mono = (mixed[0] + mixed[1]) * 0.5;
            for (channel, sample) in frame.iter_mut().enumerate() {
                let value = match (self.channels, channel) {
                    (1, _) => mono,
                    (_, 0) => mixed[0],
                    (_, 1) => mixed[1],
                    _ => mono,
                };
                *sample = T::from_sample(value.clamp(-1.0, 1.0));
            }
        }
    }
}

//! PWM duty writes and the two-channel H-bridge built on them.
use actuator_traits::{BoxError, HBridge, PwmChannel};

/// Set `channel` to `duty`, skipping the write when the peripheral already
/// reports that value. Returns whether a write happened.
pub fn set_duty<C: PwmChannel + ?Sized>(channel: &mut C, duty: u32) -> Result<bool, BoxError> {
    if channel.duty()? == duty {
        return Ok(false);
    }
    channel.write_duty(duty)?;
    channel.update()?;
    tracing::trace!(duty, "pwm duty committed");
    Ok(true)
}

/// H-bridge driven by two PWM inputs: `ina` forward, `inb` reverse.
///
/// The opposite input is always zeroed before the driving one is raised, so
/// both are never high at once.
pub struct PwmBridge<A: PwmChannel, B: PwmChannel> {
    ina: A,
    inb: B,
}

impl<A: PwmChannel, B: PwmChannel> PwmBridge<A, B> {
    pub fn new(ina: A, inb: B) -> Self {
        Self { ina, inb }
    }

    pub fn channels(&self) -> (&A, &B) {
        (&self.ina, &self.inb)
    }
}

impl<A: PwmChannel, B: PwmChannel> HBridge for PwmBridge<A, B> {
    fn drive_forward(&mut self, duty: u32) -> Result<(), BoxError> {
        set_duty(&mut self.inb, 0)?;
        set_duty(&mut self.ina, duty)?;
        Ok(())
    }

    fn drive_reverse(&mut self, duty: u32) -> Result<(), BoxError> {
        set_duty(&mut self.ina, 0)?;
        set_duty(&mut self.inb, duty)?;
        Ok(())
    }

    fn coast(&mut self) -> Result<(), BoxError> {
        set_duty(&mut self.ina, 0)?;
        set_duty(&mut self.inb, 0)?;
        Ok(())
    }

    fn max_duty(&self) -> u32 {
        self.ina.max_duty().min(self.inb.max_duty())
    }
}

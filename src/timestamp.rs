use std::io::{self, Read, Write};

use cdns_codec::{CborError, Decoder, Encoder};

/// A capture timestamp: a wall-clock second plus a sub-second tick count.
///
/// The scale of a tick (how many ticks make up one second) is not carried
/// by the timestamp itself — it comes from the enclosing
/// [`crate::StorageParameters::ticks_per_second`]. Two timestamps are only
/// meaningfully comparable under the same tick scale.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Default, Hash)]
pub struct Timestamp {

    /// Whole seconds since the Unix epoch.
    pub secs: u64,

    /// Sub-second ticks, in `0 .. ticks_per_second`.
    pub ticks: u64,
}

impl Timestamp {

    /// Builds a timestamp from a seconds/ticks pair.
    pub fn new(secs: u64, ticks: u64) -> Self {
        Self { secs, ticks }
    }

    /// The signed number of ticks from `other` to `self`, at the given
    /// tick scale: `self - other`, expressed in ticks.
    ///
    /// Anti-symmetric: `other.get_time_offset(self, tps) == -self.get_time_offset(other, tps)`.
    pub fn get_time_offset(&self, other: &Self, ticks_per_second: u64) -> i64 {
        let secs_delta = self.secs as i128 - other.secs as i128;
        let ticks_delta = self.ticks as i128 - other.ticks as i128;
        (secs_delta * ticks_per_second as i128 + ticks_delta) as i64
    }

    /// Returns `self` shifted forward (or backward, for a negative
    /// `offset`) by `offset` ticks at the given tick scale, with carries
    /// and borrows normalised so `0 <= ticks < ticks_per_second` holds in
    /// the result.
    #[must_use]
    pub fn add_time_offset(&self, offset: i64, ticks_per_second: u64) -> Self {
        let total_ticks = self.secs as i128 * ticks_per_second as i128
            + self.ticks as i128
            + offset as i128;

        let tps = ticks_per_second as i128;
        let secs = total_ticks.div_euclid(tps);
        let ticks = total_ticks.rem_euclid(tps);

        Self { secs: secs as u64, ticks: ticks as u64 }
    }

    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let mut n = enc.write_array_start(2)?;
        n += enc.write_uint(self.secs)?;
        n += enc.write_uint(self.ticks)?;
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> Result<Self, CborError> {
        dec.read_array_start()?;
        let secs = dec.read_unsigned()?;
        let ticks = dec.read_unsigned()?;
        Ok(Self { secs, ticks })
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ordering_is_lexicographic() {
        let a = Timestamp::new(42, 170);
        let b = Timestamp::new(56, 50);
        assert!(a < b);
        assert!(a <= b);
        assert!(!(b < a));
        assert!(!(b <= a));
    }

    #[test]
    fn get_offset_is_anti_symmetric() {
        let t1 = Timestamp::new(2, 700);
        let t2 = Timestamp::new(5, 300);
        assert_eq!(t2.get_time_offset(&t1, 1000), 2600);
        assert_eq!(t1.get_time_offset(&t2, 1000), -2600);
    }

    #[test]
    fn get_offset_without_carry() {
        let t1 = Timestamp::new(2, 100);
        let t2 = Timestamp::new(5, 400);
        assert_eq!(t2.get_time_offset(&t1, 1000), 3300);
        assert_eq!(t1.get_time_offset(&t2, 1000), -3300);
    }

    #[test]
    fn add_offset_carries_into_seconds() {
        let t = Timestamp::new(2, 700);
        assert_eq!(t.add_time_offset(2600, 1000), Timestamp::new(5, 300));
    }

    #[test]
    fn add_offset_borrows_from_seconds() {
        let t = Timestamp::new(5, 300);
        assert_eq!(t.add_time_offset(-2600, 1000), Timestamp::new(2, 700));
    }

    #[test]
    fn offset_law_round_trips() {
        let t1 = Timestamp::new(1636068056, 971687);
        let t2 = Timestamp::new(1636070675, 31614);
        let tps = 1_000_000;

        let offset = t1.get_time_offset(&t2, tps);
        assert_eq!(t2.add_time_offset(offset, tps), t1);
    }
}

use crate::calendar::interval::PlacedInterval;

/// Growable bitset of occupied lanes.
/// Lane indices are unbounded; a day with
/// no bars never allocates.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct LaneSet {
  words: Vec<u64>
}

impl LaneSet {
  pub fn insert(&mut self, lane: usize) {
    let (word, bit) = split(lane);
    if self.words.len() <= word {
      self.words.resize(word + 1, 0);
    }
    self.words[word] |= 1_u64 << bit;
  }

  pub fn union_with(
    &mut self,
    other: &LaneSet
  ) {
    if self.words.len() < other.words.len()
    {
      self
        .words
        .resize(other.words.len(), 0);
    }
    for (dst, src) in self
      .words
      .iter_mut()
      .zip(other.words.iter())
    {
      *dst |= *src;
    }
  }

  /// Smallest lane not in the set.
  pub fn first_free(&self) -> usize {
    for (idx, word) in
      self.words.iter().enumerate()
    {
      if *word != u64::MAX {
        return idx * 64
          + word.trailing_ones() as usize;
      }
    }
    self.words.len() * 64
  }
}

fn split(lane: usize) -> (usize, usize) {
  (lane / 64, lane % 64)
}

/// Per-day lane occupancy for one grid.
#[derive(Debug, Clone)]
pub struct LaneOccupancy {
  days: Vec<LaneSet>
}

impl LaneOccupancy {
  pub fn new(day_count: usize) -> Self {
    Self {
      days: vec![
        LaneSet::default();
        day_count
      ]
    }
  }

  /// Lowest lane free on every day of
  /// `first..=last`.
  pub fn lowest_free(
    &self,
    first: usize,
    last: usize
  ) -> usize {
    let mut busy = LaneSet::default();
    for day in self.span(first, last) {
      busy.union_with(day);
    }
    busy.first_free()
  }

  pub fn occupy(
    &mut self,
    first: usize,
    last: usize,
    lane: usize
  ) {
    let last =
      last.min(self.days.len().saturating_sub(1));
    if let Some(days) =
      self.days.get_mut(first..=last)
    {
      for day in days {
        day.insert(lane);
      }
    }
  }

  fn span(
    &self,
    first: usize,
    last: usize
  ) -> &[LaneSet] {
    let last =
      last.min(self.days.len().saturating_sub(1));
    self
      .days
      .get(first..=last)
      .unwrap_or(&[])
  }
}

/// Greedy first-fit lane assignment.
///
/// Intervals are visited by `(start_date,
/// item_id)` and each takes the lowest
/// lane free on all of its visible days,
/// so any two intervals sharing a day get
/// different lanes. The result is aligned
/// with `placed`. The lane count is not
/// guaranteed minimal.
#[tracing::instrument(skip_all, fields(
  intervals = placed.len(),
  day_count = day_count
))]
pub fn assign_lanes(
  placed: &[PlacedInterval],
  day_count: usize
) -> Vec<usize> {
  let mut order =
    (0..placed.len()).collect::<Vec<_>>();
  order.sort_by_key(|&idx| {
    (
      placed[idx].interval.start_date,
      placed[idx].item_id()
    )
  });

  let mut occupancy =
    LaneOccupancy::new(day_count);
  let mut lanes = vec![0; placed.len()];

  for idx in order {
    let entry = &placed[idx];
    let lane = occupancy.lowest_free(
      entry.first_index,
      entry.last_index
    );
    occupancy.occupy(
      entry.first_index,
      entry.last_index,
      lane
    );
    tracing::trace!(
      item = %entry.item_id(),
      first = entry.first_index,
      last = entry.last_index,
      lane,
      "assigned lane"
    );
    lanes[idx] = lane;
  }

  lanes
}

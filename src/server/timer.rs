//! # Cola de Timers del Event Loop
//! src/server/timer.rs
//!
//! Los timers repetitivos se integran al event loop como cota del timeout
//! del poll: el loop duerme como máximo hasta el próximo vencimiento.
//!
//! Usa un min-heap sobre el reloj monotónico, ordenado por deadline. La
//! reprogramación avanza un intervalo completo desde el deadline *original*
//! (tolerante al drift: un callback lento no corre el cronograma), y cada
//! timer dispara a lo sumo una vez por wakeup aunque acumule atraso.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Entrada del heap de timers
#[derive(Debug, Clone)]
struct TimerEntry {
    deadline: Instant,
    interval: Duration,
    /// Id del callback en el Callback Gate
    id: usize,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Invertimos para que el BinaryHeap (max-heap) entregue el menor
        // deadline primero; a igual deadline desempata el id menor
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Cola de timers repetitivos keyed por próximo deadline
pub struct TimerQueue {
    heap: BinaryHeap<TimerEntry>,
}

impl TimerQueue {
    /// Crea la cola; el índice de cada intervalo es el id del timer
    pub fn new(intervals_ms: &[u64], now: Instant) -> Self {
        let heap = intervals_ms
            .iter()
            .enumerate()
            .map(|(id, ms)| {
                let interval = Duration::from_millis((*ms).max(1));
                TimerEntry {
                    deadline: now + interval,
                    interval,
                    id,
                }
            })
            .collect();
        Self { heap }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Tiempo hasta el próximo vencimiento (cero si ya venció)
    pub fn next_timeout(&self, now: Instant) -> Option<Duration> {
        self.heap
            .peek()
            .map(|entry| entry.deadline.saturating_duration_since(now))
    }

    /// Ids de los timers vencidos a `now`
    ///
    /// Cada timer vencido se retorna una sola vez y se reprograma avanzando
    /// un intervalo desde su deadline original. Si sigue atrasado, volverá
    /// a dispararse recién en el próximo wakeup.
    pub fn take_due(&mut self, now: Instant) -> Vec<usize> {
        let mut expired = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.deadline > now {
                break;
            }
            expired.push(self.heap.pop().unwrap());
        }

        let mut due = Vec::with_capacity(expired.len());
        for mut entry in expired {
            due.push(entry.id);
            entry.deadline += entry.interval;
            self.heap.push(entry);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_queue_has_no_timeout() {
        let queue = TimerQueue::new(&[], Instant::now());
        assert!(queue.is_empty());
        assert!(queue.next_timeout(Instant::now()).is_none());
    }

    #[test]
    fn test_next_timeout_is_earliest_deadline() {
        let now = Instant::now();
        let queue = TimerQueue::new(&[1000, 50, 300], now);

        let timeout = queue.next_timeout(now).unwrap();
        assert_eq!(timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_take_due_fires_once_per_wakeup() {
        let now = Instant::now();
        let mut queue = TimerQueue::new(&[100], now);

        // Muy atrasado: varios intervalos perdidos
        let late = now + Duration::from_millis(450);
        assert_eq!(queue.take_due(late), vec![0]);

        // En el mismo instante no vuelve a disparar (ya avanzó un intervalo),
        // pero sigue vencido para el próximo wakeup
        assert_eq!(queue.next_timeout(late), Some(Duration::ZERO));
        assert_eq!(queue.take_due(late), vec![0]);
    }

    #[test]
    fn test_reschedule_from_original_deadline() {
        let now = Instant::now();
        let mut queue = TimerQueue::new(&[100], now);

        // Dispara tarde: el próximo deadline sale del original (now+100),
        // no del momento del disparo
        let late = now + Duration::from_millis(130);
        assert_eq!(queue.take_due(late), vec![0]);

        let timeout = queue.next_timeout(late).unwrap();
        assert_eq!(timeout, Duration::from_millis(70));
    }

    #[test]
    fn test_multiple_timers_due_together() {
        let now = Instant::now();
        let mut queue = TimerQueue::new(&[10, 10, 500], now);

        let later = now + Duration::from_millis(20);
        let due = queue.take_due(later);
        assert_eq!(due, vec![0, 1]);
    }

    #[test]
    fn test_not_due_yet() {
        let now = Instant::now();
        let mut queue = TimerQueue::new(&[100], now);
        assert!(queue.take_due(now).is_empty());
    }
}

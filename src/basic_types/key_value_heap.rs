//a max-heap where the keys range over [0, ..., n-1] and the values are nonnegative floats
//the heap can be queried for the key with the maximum value, keys can be (temporarily)
//removed and restored, and the values of entries can be incremented or divided in bulk

use crate::marrow_assert_moderate;

#[derive(Default)]
pub struct KeyValueHeap {
    values: Vec<f64>, //contains the values stored as a heap, the value of key i is in position map_key_to_position[i]
    map_key_to_position: Vec<u32>, //[i] is the location of the value of key i in the values array
    map_position_to_key: Vec<u32>, //[i] is the key associated with values[i]
    end_position: u32,             //the index past the last element in the heap
}

impl KeyValueHeap {
    pub fn new() -> KeyValueHeap {
        KeyValueHeap {
            values: vec![],
            map_key_to_position: vec![],
            map_position_to_key: vec![],
            end_position: 0,
        }
    }

    //returns the key with maximum value from the heap, or None if the heap is empty
    //  note that this does not delete the key (see 'pop_max' for get-and-delete)
    //  O(1)
    pub fn peek_max(&self) -> Option<u32> {
        if self.is_empty() {
            None
        } else {
            Some(self.map_position_to_key[0])
        }
    }

    pub fn get_value(&self, key: u32) -> f64 {
        marrow_assert_moderate!((key as usize) < self.map_key_to_position.len());
        self.values[self.map_key_to_position[key as usize] as usize]
    }

    //deletes the key with maximum value from the heap and returns it, or None if the heap is empty
    //  O(logn)
    pub fn pop_max(&mut self) -> Option<u32> {
        let best_key = self.peek_max()?;
        self.delete_key(best_key);
        Some(best_key)
    }

    //increments the value of the element of 'key' by 'increment'
    //  note that increments may be applied to keys that are not currently present,
    //  in that case the new value is only visible after 'restore_key'
    //  O(logn)
    pub fn increment(&mut self, key: u32, increment: f64) {
        let position = self.map_key_to_position[key as usize];
        self.values[position as usize] += increment;
        if self.is_key_present(key) {
            self.sift_up(position);
        }
    }

    //restores the entry with key 'key' to the heap if not present, otherwise does nothing
    //  its value is the value it had before 'delete_key' was called, plus any increments since
    //  O(logn)
    pub fn restore_key(&mut self, key: u32) {
        if !self.is_key_present(key) {
            //the key is somewhere in the range [end_position, max_size-1]
            //place it at the end of the heap, grow the heap, and sift up
            let position = self.map_key_to_position[key as usize];
            marrow_assert_moderate!(position >= self.end_position);
            self.swap_positions(position, self.end_position);
            self.end_position += 1;
            self.sift_up(self.end_position - 1);
        }
    }

    //removes the entry with key 'key' (temporarily) from the heap if present, otherwise does nothing
    //  the value remains recorded internally and is available upon calling 'restore_key'
    //  the value can still be subjected to 'divide_values'
    //  O(logn)
    pub fn delete_key(&mut self, key: u32) {
        if self.is_key_present(key) {
            //place the key at the end of the heap, shrink the heap, and sift down to repair
            let position = self.map_key_to_position[key as usize];
            self.swap_positions(position, self.end_position - 1);
            self.end_position -= 1;
            if position < self.end_position {
                self.sift_down(position);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end_position == 0
    }

    pub fn is_key_present(&self, key: u32) -> bool {
        self.map_key_to_position[key as usize] < self.end_position
    }

    //increases the size of the heap by one, the new key gets the given initial value
    pub fn grow(&mut self, value: f64) {
        let new_key = self.values.len() as u32;
        self.values.push(value);
        self.map_key_to_position.push(new_key);
        self.map_position_to_key.push(new_key);
        self.swap_positions(self.end_position, new_key);
        self.end_position += 1;
        self.sift_up(self.end_position - 1);
    }

    //divides all values in the heap by 'divisor', including values of removed keys
    //  O(n)
    pub fn divide_values(&mut self, divisor: f64) {
        for value in self.values.iter_mut() {
            *value /= divisor;
        }
    }

    fn swap_positions(&mut self, a: u32, b: u32) {
        let a = a as usize;
        let b = b as usize;

        let key_i = self.map_position_to_key[a] as usize;
        let key_j = self.map_position_to_key[b] as usize;

        self.values.swap(a, b);
        self.map_position_to_key.swap(a, b);
        self.map_key_to_position.swap(key_i, key_j);
    }

    fn sift_up(&mut self, position: u32) {
        //only sift up if not at the root
        if position > 0 {
            let parent_position = KeyValueHeap::get_parent_position(position);
            if self.values[parent_position as usize] < self.values[position as usize] {
                self.swap_positions(parent_position, position);
                self.sift_up(parent_position);
            }
        }
    }

    fn sift_down(&mut self, position: u32) {
        marrow_assert_moderate!(position < self.end_position);

        if !self.is_heap_locally(position) {
            let largest_child_position = self.get_largest_child_position(position);
            self.swap_positions(largest_child_position, position);
            self.sift_down(largest_child_position);
        }
    }

    fn is_heap_locally(&self, position: u32) -> bool {
        //either the node is a leaf, or its value is at least as large as the values of its children
        let left_child_position = KeyValueHeap::get_left_child_position(position);
        let right_child_position = KeyValueHeap::get_right_child_position(position);

        self.is_leaf(position)
            || (self.values[position as usize] >= self.values[left_child_position as usize]
                && (right_child_position >= self.end_position
                    || self.values[position as usize]
                        >= self.values[right_child_position as usize]))
    }

    fn is_leaf(&self, position: u32) -> bool {
        KeyValueHeap::get_left_child_position(position) >= self.end_position
    }

    fn get_largest_child_position(&self, position: u32) -> u32 {
        marrow_assert_moderate!(!self.is_leaf(position));

        let left_child_position = KeyValueHeap::get_left_child_position(position);
        let right_child_position = KeyValueHeap::get_right_child_position(position);

        if right_child_position < self.end_position
            && self.values[right_child_position as usize]
                > self.values[left_child_position as usize]
        {
            right_child_position
        } else {
            left_child_position
        }
    }

    fn get_parent_position(child_position: u32) -> u32 {
        marrow_assert_moderate!(child_position > 0, "Root has no parent.");
        (child_position - 1) / 2
    }

    fn get_left_child_position(position: u32) -> u32 {
        2 * position + 1
    }

    fn get_right_child_position(position: u32) -> u32 {
        2 * position + 2
    }
}

#[cfg(test)]
mod tests {
    use super::KeyValueHeap;

    fn heap_with_values(values: &[f64]) -> KeyValueHeap {
        let mut heap = KeyValueHeap::new();
        for value in values {
            heap.grow(*value);
        }
        heap
    }

    #[test]
    fn test_peek_max_returns_largest() {
        let heap = heap_with_values(&[1.0, 5.0, 3.0, 4.0]);
        assert_eq!(heap.peek_max(), Some(1));
    }

    #[test]
    fn test_pop_max_drains_in_order() {
        let mut heap = heap_with_values(&[2.0, 7.0, 5.0, 1.0]);
        assert_eq!(heap.pop_max(), Some(1));
        assert_eq!(heap.pop_max(), Some(2));
        assert_eq!(heap.pop_max(), Some(0));
        assert_eq!(heap.pop_max(), Some(3));
        assert_eq!(heap.pop_max(), None);
    }

    #[test]
    fn test_increment_changes_max() {
        let mut heap = heap_with_values(&[2.0, 7.0, 5.0]);
        heap.increment(0, 10.0);
        assert_eq!(heap.peek_max(), Some(0));
        assert_eq!(heap.get_value(0), 12.0);
    }

    #[test]
    fn test_delete_and_restore_key() {
        let mut heap = heap_with_values(&[2.0, 7.0, 5.0]);
        heap.delete_key(1);
        assert!(!heap.is_key_present(1));
        assert_eq!(heap.peek_max(), Some(2));

        //increments on absent keys are recorded but do not resurface the key
        heap.increment(1, 1.0);
        assert!(!heap.is_key_present(1));

        heap.restore_key(1);
        assert!(heap.is_key_present(1));
        assert_eq!(heap.peek_max(), Some(1));
        assert_eq!(heap.get_value(1), 8.0);
    }

    #[test]
    fn test_divide_values_applies_to_deleted_keys() {
        let mut heap = heap_with_values(&[2.0, 8.0]);
        heap.delete_key(1);
        heap.divide_values(2.0);
        heap.restore_key(1);
        assert_eq!(heap.get_value(1), 4.0);
        assert_eq!(heap.get_value(0), 1.0);
    }
}
